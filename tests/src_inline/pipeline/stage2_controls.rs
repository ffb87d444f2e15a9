use super::*;

fn reading(plate: &str, role: ControlRole, value: f64) -> WellReading {
    WellReading {
        plate: plate.to_string(),
        well: None,
        label: role.as_str().to_string(),
        role,
        cell_line: String::new(),
        method: String::new(),
        value,
    }
}

const HIGH: [f64; 6] = [1681581.0, 1714396.0, 1757023.0, 1165473.0, 1203301.0, 1208762.0];
const LOW: [f64; 7] = [8451.0, 5063.0, 5276.0, 4501.0, 4055.0, 3263.0, 1652.0];

#[test]
fn test_ph5ch8_lipo_reference_averages() {
    let mut readings = Vec::new();
    readings.extend(HIGH.iter().map(|&v| reading("PH5CH8_Lipo", ControlRole::High, v)));
    readings.extend(LOW.iter().map(|&v| reading("PH5CH8_Lipo", ControlRole::Low, v)));
    readings.push(reading("PH5CH8_Lipo", ControlRole::Test, 7131.0));

    let out = run_stage2(&readings, ControlScope::Plate);
    let agg = out.for_plate("PH5CH8_Lipo").unwrap();
    assert_eq!(agg.n_high, 6);
    assert_eq!(agg.n_low, 7);
    assert!((agg.high_avg - 8730536.0 / 6.0).abs() < 1e-6);
    assert!((agg.low_avg - 32261.0 / 7.0).abs() < 1e-9);
    assert!((agg.denominator() - 1_450_480.6).abs() < 1.0);
    assert!(!agg.is_degenerate());
}

#[test]
fn test_per_plate_vs_dataset_scope() {
    let readings = vec![
        reading("P1", ControlRole::High, 100.0),
        reading("P1", ControlRole::Low, 10.0),
        reading("P2", ControlRole::High, 300.0),
        reading("P2", ControlRole::Low, 30.0),
        reading("P2", ControlRole::Ignore, 1e9),
    ];
    let per_plate = run_stage2(&readings, ControlScope::Plate);
    assert_eq!(per_plate.controls.len(), 2);
    assert_eq!(per_plate.for_plate("P2").unwrap().high_avg, 300.0);
    assert!(per_plate.for_plate("P3").is_none());

    let pooled = run_stage2(&readings, ControlScope::Dataset);
    assert_eq!(pooled.controls.len(), 1);
    let agg = pooled.for_plate("P3").unwrap();
    assert_eq!(agg.high_avg, 200.0);
    assert_eq!(agg.low_avg, 20.0);
}

#[test]
fn test_empty_reference_sets_average_to_zero() {
    let readings = vec![reading("P1", ControlRole::Test, 5.0)];
    let out = run_stage2(&readings, ControlScope::Plate);
    let agg = out.for_plate("P1").unwrap();
    assert_eq!(agg.high_avg, 0.0);
    assert_eq!(agg.low_avg, 0.0);
    assert!(agg.is_degenerate());
}

#[test]
fn test_degenerate_when_high_not_above_low() {
    let agg = ControlAggregate::from_values("P", &[10.0], &[10.0]);
    assert!(agg.is_degenerate());
    let agg = ControlAggregate::from_values("P", &[5.0], &[10.0]);
    assert!(agg.is_degenerate());
}
