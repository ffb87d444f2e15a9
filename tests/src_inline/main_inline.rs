use super::*;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("kira_viability_main_{}_{}", std::process::id(), id));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn data_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data").join(name)
}

fn run_args(cli: Cli) -> RunArgs {
    match cli.command {
        Command::Run(args) => args,
        Command::Normalize(_) => panic!("expected run"),
    }
}

fn grid_config(out: &Path) -> RunConfig {
    let cli = Cli::try_parse_from([
        "kira-viabilityqc",
        "run",
        "--input",
        data_path("transfection_plates_v1.csv").to_str().unwrap(),
        "--layout",
        "grid",
        "--platemap",
        data_path("platemap_v1.tsv").to_str().unwrap(),
        "--label-style",
        "hairpin",
        "--out",
        out.to_str().unwrap(),
    ])
    .unwrap();
    RunConfig::from_args(run_args(cli)).unwrap()
}

#[test]
fn test_parse_run_defaults() {
    let cli = Cli::try_parse_from([
        "kira-viabilityqc",
        "run",
        "--input",
        "plates.csv",
        "--layout",
        "long",
        "--out",
        "out",
    ])
    .unwrap();
    assert!(!cli.verbose);
    let config = RunConfig::from_args(run_args(cli)).unwrap();
    assert_eq!(config.layout, InputLayout::Long);
    assert_eq!(config.out_dir, PathBuf::from("out"));
    assert_eq!(config.profile, AnalysisProfile::default_v1());
}

#[test]
fn test_parse_run_overrides() {
    let cli = Cli::try_parse_from([
        "kira-viabilityqc",
        "-v",
        "run",
        "--input",
        "plates.csv",
        "--layout",
        "long",
        "--out",
        "out",
        "--control-scope",
        "dataset",
        "--no-range-filter",
        "--average-replicates",
    ])
    .unwrap();
    assert!(cli.verbose);
    let config = RunConfig::from_args(run_args(cli)).unwrap();
    assert_eq!(config.profile.control_scope, ControlScope::Dataset);
    assert_eq!(config.profile.range_filter, None);
    assert!(config.profile.average_replicates);
}

#[test]
fn test_parse_rejects_unknown_layout() {
    let err = Cli::try_parse_from([
        "kira-viabilityqc",
        "run",
        "--input",
        "x.csv",
        "--layout",
        "matrix",
        "--out",
        "out",
    ]);
    assert!(err.is_err());
}

#[test]
fn test_profile_file_then_cli_override() {
    let dir = make_temp_dir();
    let profile_path = dir.join("profile.json");
    std::fs::write(
        &profile_path,
        r#"{"control_scope": "dataset", "label_style": "hairpin", "range_filter": {"min": -10.0, "max": 100.0}}"#,
    )
    .unwrap();
    let cli = Cli::try_parse_from([
        "kira-viabilityqc",
        "run",
        "--input",
        "x.csv",
        "--layout",
        "long",
        "--out",
        "out",
        "--profile",
        profile_path.to_str().unwrap(),
        "--control-scope",
        "plate",
    ])
    .unwrap();
    let config = RunConfig::from_args(run_args(cli)).unwrap();
    assert_eq!(config.profile.control_scope, ControlScope::Plate);
    assert_eq!(config.profile.label_style, LabelStyle::Hairpin);
    assert_eq!(config.profile.range_filter.unwrap().min, -10.0);
}

#[test]
fn test_normalize_command_output() {
    let cli = Cli::try_parse_from([
        "kira-viabilityqc",
        "normalize",
        "--value",
        "500",
        "--high",
        "900,1100",
        "--low",
        "100",
    ])
    .unwrap();
    let Command::Normalize(args) = cli.command else {
        panic!("expected normalize");
    };
    assert_eq!(args.high, vec![900.0, 1100.0]);
    let text = render_normalize(args.value, &args.high, &args.low);
    assert!(text.contains("high_avg\t1000.000000\n"));
    assert!(text.contains("denominator\t900.000000\n"));
    assert!(text.contains("cell_death_pct\t55.555556\n"));
    assert!(text.contains("degenerate\tfalse\n"));
}

#[test]
fn test_normalize_flags_in_any_order_with_negative_readings() {
    let cli = Cli::try_parse_from([
        "kira-viabilityqc",
        "normalize",
        "--low",
        "-20,20",
        "--value",
        "-100",
        "--high",
        "1000",
    ])
    .unwrap();
    let Command::Normalize(args) = cli.command else {
        panic!("expected normalize");
    };
    assert_eq!(args.low, vec![-20.0, 20.0]);
    assert_eq!(args.value, -100.0);
    assert_eq!(args.high, vec![1000.0]);
    let text = render_normalize(args.value, &args.high, &args.low);
    assert!(text.contains("low_avg\t0.000000\n"));
    assert!(text.contains("cell_death_pct\t110.000000\n"));
}

#[test]
fn test_normalize_degenerate_is_zero() {
    let text = render_normalize(5.0, &[10.0], &[20.0]);
    assert!(text.contains("cell_death_pct\t0.000000\n"));
    assert!(text.contains("degenerate\ttrue\n"));
}

#[test]
fn test_grid_requires_platemap() {
    let out = make_temp_dir();
    let mut config = grid_config(&out);
    config.platemap = None;
    let err = run_pipeline(&config).unwrap_err();
    assert!(matches!(err, PipelineError::Input(InputError::MissingInput(_))));
}

#[test]
fn test_sample_dataset_end_to_end_is_deterministic() {
    let out_a = make_temp_dir();
    let out_b = make_temp_dir();
    run_pipeline(&grid_config(&out_a)).unwrap();
    run_pipeline(&grid_config(&out_b)).unwrap();

    for name in [
        "observations.tsv",
        "controls.tsv",
        "summary.tsv",
        "summary.json",
        "report.txt",
    ] {
        let a = std::fs::read(out_a.join(name)).unwrap();
        let b = std::fs::read(out_b.join(name)).unwrap();
        assert_eq!(a, b, "{name}");
    }

    let controls = std::fs::read_to_string(out_a.join("controls.tsv")).unwrap();
    let plates: Vec<&str> = controls
        .lines()
        .skip(1)
        .map(|l| l.split('\t').next().unwrap())
        .collect();
    assert_eq!(
        plates,
        vec!["PH5CH8_AAV2", "PH5CH8_Lipo", "THLE2_AAV2", "THLE2_Lipo"]
    );

    let summary = std::fs::read_to_string(out_a.join("summary.tsv")).unwrap();
    assert!(summary.contains("PH5CH8\tLipo\tGPC3\tGPC3.1\t"));
    assert!(!out_a.join("fits.tsv").exists());
}

#[test]
fn test_knockdown_end_to_end() {
    let dir = make_temp_dir();
    let input = dir.join("kd.csv");
    let mut csv = String::from("well_id,hairpin,kd_percent,lum,blank,untreated\n");
    for (i, kd) in [5.0, 20.0, 35.0, 50.0, 65.0, 80.0, 95.0].iter().enumerate() {
        let survival = 100.0 / (1.0 + (kd / 40.0f64).powf(-2.0));
        let lum = 100.0 + survival * 10.0;
        csv.push_str(&format!("A{},shGPC3,{},{},100,1100\n", i + 1, kd, lum));
    }
    csv.push_str("B1,shEmpty,10,900,100,1100\n");
    csv.push_str("B2,,10,900,100,1100\n");
    std::fs::write(&input, csv).unwrap();

    let out = dir.join("out");
    let cli = Cli::try_parse_from([
        "kira-viabilityqc",
        "run",
        "--input",
        input.to_str().unwrap(),
        "--layout",
        "knockdown",
        "--out",
        out.to_str().unwrap(),
    ])
    .unwrap();
    let config = RunConfig::from_args(run_args(cli)).unwrap();
    run_pipeline(&config).unwrap();

    let fits = std::fs::read_to_string(out.join("fits.tsv")).unwrap();
    let lines: Vec<&str> = fits.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("shEmpty\t1\tinsufficient_points"));
    let cols: Vec<&str> = lines[2].split('\t').collect();
    assert_eq!(cols[0], "shGPC3");
    assert_eq!(cols[2], "ok");
    let ic50: f64 = cols[3].parse().unwrap();
    assert!((ic50 - 40.0).abs() < 1.0, "{ic50}");

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("summary.json")).unwrap()).unwrap();
    assert_eq!(value["rows"]["rows_dropped"], 1);
    assert_eq!(value["fits"]["ok"], 1);
}
