// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::{Float64Array, Int32Array, RecordBatch};
use arrow_schema::{DataType, Field, Schema};
use selector::Pipeline;
use settings::{Setting, Settings, SettingsNode};
use tablefs::{TableFile, TableFileWriter};
use tempfile::tempdir;

// Import the command functions directly
use cmd::commands::{
    TabulateOptions, map_multi_command, map_single_command, reduce_command, settings_command,
    tabulate_command,
};
use cmd::common::RunContext;

/// Write a run file with one `evt` table of pulses
fn write_run(path: &Path, channels: &[i32], energies: &[f64]) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("channel", DataType::Int32, false),
        Field::new("energy", DataType::Float64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int32Array::from(channels.to_vec())),
            Arc::new(Float64Array::from(energies.to_vec())),
        ],
    )
    .unwrap();
    let mut writer = TableFileWriter::create(path).unwrap();
    writer.write_table("evt", &batch).unwrap();
    let _ = writer.finish().unwrap();
}

fn context_with(settings: &[(&str, f64)]) -> RunContext {
    let mut tree = Settings::new();
    for (name, value) in settings {
        tree.set(name, *value).unwrap();
    }
    RunContext::new(tree)
}

/// Helper for tests to capture settings output as one string
fn settings_for_test(ctx: &RunContext, input: Option<&str>, json: bool) -> anyhow::Result<String> {
    let mut out = String::new();
    settings_command(ctx, input, json, std::io::empty(), |text| out.push_str(&text))?;
    Ok(out)
}

async fn tabulate_for_test(
    path: &str,
    varexp: &str,
    options: &TabulateOptions,
) -> anyhow::Result<String> {
    let mut out = Vec::new();
    let _ = tabulate_command(path, varexp, options, &mut out).await?;
    Ok(String::from_utf8(out)?)
}

#[tokio::test]
async fn test_map_single_embeds_settings() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let input = tmp.path().join("run1.tbl");
    let output = tmp.path().join("run1.scaled.tbl");
    write_run(&input, &[1, 2], &[0.5, 1.5]);

    let ctx = context_with(&[("scale.factor", 2.0)]);
    map_single_command(&ctx, &Pipeline::default(), "scale", &output, &input)?;

    // The defaults the stage read are saved next to the explicit value.
    let text = settings_for_test(&ctx, Some(&output.display().to_string()), false)?;
    assert!(text.contains("scale.factor = 2.0"));
    assert!(text.contains("scale.columns = \"\""));

    // Provenance survives the trip through the output file.
    let embedded = Settings::get_from(&TableFile::open(&output)?, "settings")?.unwrap();
    assert_eq!(
        embedded.tree().node("scale.factor")?,
        Some(&SettingsNode::Leaf(Setting::new(2.0)))
    );
    assert_eq!(
        embedded.tree().node("scale.columns")?,
        Some(&SettingsNode::Leaf(Setting::recorded_default(String::new())))
    );

    let options = TabulateOptions {
        selection: "energy > 2".to_string(),
        ..TabulateOptions::default()
    };
    let dump = tabulate_for_test(&format!("{}/evt", output.display()), "channel", &options).await?;
    assert_eq!(dump, "channel\n2\n");
    Ok(())
}

#[tokio::test]
async fn test_map_single_unknown_mapper() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let input = tmp.path().join("run1.tbl");
    let output = tmp.path().join("out.tbl");
    write_run(&input, &[1], &[1.0]);

    let ctx = RunContext::default();
    let err = map_single_command(&ctx, &Pipeline::default(), "copy,bogus", &output, &input)
        .unwrap_err();
    assert!(format!("{err:#}").contains("bogus"));
    assert!(!output.exists());
    Ok(())
}

#[tokio::test]
async fn test_map_multi_reports_each_file() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let good = tmp.path().join("a.tbl");
    let missing = tmp.path().join("missing.tbl");
    write_run(&good, &[1, 2, 3], &[1.0, 2.0, 3.0]);

    let ctx = RunContext::default();
    let inputs: Vec<PathBuf> = vec![good.clone(), missing.clone()];
    let mut lines = Vec::new();
    let err = map_multi_command(
        &ctx,
        &Pipeline::default(),
        "copy",
        "cp",
        &inputs,
        true,
        |line| lines.push(line),
    )
    .await
    .unwrap_err();

    assert_eq!(err.to_string(), "1 of 2 input files failed");
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("a.cp.tbl"));
    assert!(lines[1].starts_with(&missing.display().to_string()));

    assert!(tmp.path().join("a.cp.tbl").is_file());
    assert!(!tmp.path().join("missing.cp.tbl").exists());
    Ok(())
}

#[tokio::test]
async fn test_reduce_then_tabulate() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let a = tmp.path().join("a.tbl");
    let b = tmp.path().join("b.tbl");
    let total = tmp.path().join("total.tbl");
    write_run(&a, &[1, 2], &[1.0, 2.0]);
    write_run(&b, &[3], &[4.0]);

    let ctx = RunContext::default();
    reduce_command(&ctx, &Pipeline::default(), "sum", &total, &[a, b])?;

    let dump = tabulate_for_test(
        &format!("{}/evt", total.display()),
        "channel, entries",
        &TabulateOptions::default(),
    )
    .await?;
    assert_eq!(dump, "channel\tentries\n6\t3\n");
    Ok(())
}

#[tokio::test]
async fn test_tabulate_across_files() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    write_run(&tmp.path().join("run1.tbl"), &[1, 2], &[1.0, 2.0]);
    write_run(&tmp.path().join("run2.tbl"), &[3, 4, 5], &[3.0, 4.0, 5.0]);
    write_run(&tmp.path().join("other.tbl"), &[9], &[9.0]);

    let pattern = format!("{}/run*.tbl/evt", tmp.path().display());
    let dump = tabulate_for_test(&pattern, "channel", &TabulateOptions::default()).await?;
    let mut channels: Vec<&str> = dump.lines().skip(1).collect();
    channels.sort_unstable();
    assert_eq!(channels, vec!["1", "2", "3", "4", "5"]);

    // Range limits apply to the chain as a whole.
    let options = TabulateOptions {
        n_entries: 2,
        start_entry: 4,
        ..TabulateOptions::default()
    };
    let dump = tabulate_for_test(&pattern, "channel", &options).await?;
    assert_eq!(dump.lines().count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_tabulate_usage_errors() {
    let options = TabulateOptions::default();
    assert!(tabulate_for_test("onlyfile", "x", &options).await.is_err());

    let tmp = tempdir().unwrap();
    let run = tmp.path().join("run1.tbl");
    write_run(&run, &[1], &[1.0]);
    let err = tabulate_for_test(&format!("{}/evt", run.display()), "width", &options)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("width"));
}

#[test]
fn test_settings_sources() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let flat = tmp.path().join("det.conf");
    std::fs::write(&flat, "det.gain = 1.5\ndet.name = \"west\"\n")?;

    let ctx = RunContext::default();
    let json = settings_for_test(&ctx, Some(&flat.display().to_string()), true)?;
    assert!(json.contains(r#""name": "west""#));

    let nested = tmp.path().join("det.json");
    std::fs::write(&nested, &json)?;
    let text = settings_for_test(&ctx, Some(&nested.display().to_string()), false)?;
    assert_eq!(text, "det.gain = 1.5\ndet.name = \"west\"\n");

    let run = tmp.path().join("run1.tbl");
    write_run(&run, &[1], &[1.0]);
    let err = settings_for_test(&ctx, Some(&format!("{}/nope", run.display())), false)
        .unwrap_err();
    assert!(err.to_string().contains("No settings stored at 'nope'"));
    Ok(())
}
