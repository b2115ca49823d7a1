mod analyzer;
mod error;
mod filter;
mod models;
mod reader;
mod report;
mod resolver;

use analyzer::BandAnalyzer;
use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use models::{parse_subject_override, Config};
use reader::DatasetReader;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let matches = Command::new("grade-band-report")
        .version("0.1")
        .about("Builds per-subject top-N band reports from an exam score spreadsheet")
        .arg(
            Arg::new("input")
                .value_name("FILE")
                .help("Score spreadsheet (.xlsx, .xls, .xlsb, .ods or .csv)")
                .required(true),
        )
        .arg(
            Arg::new("sheet")
                .short('s')
                .long("sheet")
                .value_name("NAME")
                .help("Worksheet to read (defaults to the first sheet)"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output .xlsx path (defaults to <input>_分层统计表.xlsx beside the input)"),
        )
        .arg(
            Arg::new("subject")
                .long("subject")
                .value_name("NAME=THRESHOLDS")
                .help("Add a subject or replace its thresholds, e.g. 语文=300,400,600")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("only")
                .long("only")
                .value_name("NAME")
                .help("Only report these subjects, in this order")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("csv")
                .long("csv")
                .value_name("FILE")
                .help("Also export the report grid as CSV"),
        )
        .arg(
            Arg::new("list-sheets")
                .long("list-sheets")
                .help("Print the workbook's sheet names and exit")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let input = PathBuf::from(
        matches
            .get_one::<String>("input")
            .context("missing input file")?,
    );
    let reader = DatasetReader::new();

    if matches.get_flag("list-sheets") {
        let names = reader
            .sheet_names(&input)
            .with_context(|| format!("Failed to read sheet list from: {}", input.display()))?;
        if names.is_empty() {
            println!("📄 {} has a single unnamed sheet", input.display());
        }
        for (i, name) in names.iter().enumerate() {
            println!("   {}. {}", i + 1, name);
        }
        return Ok(());
    }

    let config_file = matches
        .get_one::<String>("config")
        .context("missing config path")?;
    let mut config = load_or_create_config(config_file)?;

    // Command line overrides are applied before any file is read
    if let Some(overrides) = matches.get_many::<String>("subject") {
        for text in overrides {
            let (name, thresholds) = parse_subject_override(text)?;
            println!("🔧 Thresholds for {}: {:?}", name, thresholds.as_slice());
            config.upsert_subject(&name, thresholds);
        }
    }
    if let Some(only) = matches.get_many::<String>("only") {
        let names: Vec<String> = only.cloned().collect();
        config.retain_subjects(&names);
    }
    config.validate()?;

    let output = matches
        .get_one::<String>("output")
        .map(PathBuf::from)
        .unwrap_or_else(|| report::default_output_path(&input, &config.output_file_suffix));
    let sheet = matches.get_one::<String>("sheet").map(String::as_str);

    println!("📂 Reading scores from: {}", input.display());
    let dataset = reader
        .read_file(&input, sheet)
        .with_context(|| format!("Failed to read file: {}", input.display()))?;
    println!("   ✅ Loaded {} rows, {} columns", dataset.len(), dataset.columns.len());

    let subject_names: Vec<&str> = config.subjects.iter().map(|s| s.name.as_str()).collect();
    println!("🎯 Subjects: {}", subject_names.join(", "));

    let analyzer = BandAnalyzer::new(&config);
    let all_bands = analyzer
        .analyze_all_subjects(&dataset, |progress| {
            println!("⏳ Processing {} ({}/{})", progress.subject, progress.index, progress.total);
        })
        .context("Report generation failed")?;

    let table = report::assemble_report(&all_bands, &config);
    write_outputs(&table, &output, matches.get_one::<String>("csv").map(Path::new))?;

    print_summary(&all_bands);
    println!("\n✅ Report written to: {}", output.display());
    Ok(())
}

fn load_or_create_config(config_file: &str) -> Result<Config> {
    if Path::new(config_file).exists() {
        println!("📋 Loading configuration from: {}", config_file);
        Config::load_from_file(config_file)
            .with_context(|| format!("Failed to load configuration: {}", config_file))
    } else {
        println!("📝 Creating default configuration file: {}", config_file);
        let default_config = Config::default();
        default_config.save_to_file(config_file)?;
        println!("   Edit {} to change subjects and thresholds.", config_file);
        Ok(default_config)
    }
}

fn write_outputs(table: &report::ReportTable, output: &Path, csv: Option<&Path>) -> Result<()> {
    report::write_xlsx(table, output)
        .with_context(|| format!("Failed to write report: {}", output.display()))?;

    if let Some(csv_path) = csv {
        report::write_csv(table, csv_path)
            .with_context(|| format!("Failed to write CSV export: {}", csv_path.display()))?;
        println!("📄 CSV export: {}", csv_path.display());
    }
    Ok(())
}

fn print_summary(all_bands: &[models::SubjectBands]) {
    println!("\n📊 SUMMARY");
    println!("==========");
    for bands in all_bands {
        let students = bands.segments.iter().filter(|s| !s.is_marker()).count();
        let layers = bands
            .segments
            .iter()
            .filter(|s| matches!(s, models::Segment::Boundary { .. }))
            .count();
        println!("   {} - {} ranked students, {} bands", bands.subject, students, layers);
    }
}
