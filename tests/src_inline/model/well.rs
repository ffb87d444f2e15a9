use super::*;

#[test]
fn test_well_coord_parse_and_display() {
    let a1: WellCoord = "A1".parse().unwrap();
    assert_eq!(a1, WellCoord { row: 0, col: 0 });
    assert_eq!(a1.to_string(), "A1");

    let h12: WellCoord = " h12 ".parse().unwrap();
    assert_eq!(h12, WellCoord { row: 7, col: 11 });

    let b7: WellCoord = "B07".parse().unwrap();
    assert_eq!(b7.to_string(), "B7");
}

#[test]
fn test_well_coord_rejects_out_of_plate() {
    assert!("I1".parse::<WellCoord>().is_err());
    assert!("A0".parse::<WellCoord>().is_err());
    assert!("A13".parse::<WellCoord>().is_err());
    assert!("".parse::<WellCoord>().is_err());
    assert!("AA".parse::<WellCoord>().is_err());
}

#[test]
fn test_well_coord_order_is_row_major() {
    let mut wells: Vec<WellCoord> = ["B1", "A12", "A2"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();
    wells.sort();
    let names: Vec<String> = wells.iter().map(|w| w.to_string()).collect();
    assert_eq!(names, vec!["A2", "A12", "B1"]);
}

#[test]
fn test_control_role_aliases() {
    assert_eq!("Untreated".parse::<ControlRole>(), Ok(ControlRole::High));
    assert_eq!("blank".parse::<ControlRole>(), Ok(ControlRole::Low));
    assert_eq!("TEST".parse::<ControlRole>(), Ok(ControlRole::Test));
    assert_eq!("skip".parse::<ControlRole>(), Ok(ControlRole::Ignore));
    assert!("reference".parse::<ControlRole>().is_err());
}
