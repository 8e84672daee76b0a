// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Running mapper stages over table files.
//!
//! Three shapes are supported: one input to one output (`map_single`), many
//! inputs each to their own output (`map_multi`), and many inputs combined
//! into one output (`reduce`). Every output is written atomically and
//! carries the settings that produced it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use diagnostics::*;
use settings::Settings;
use tablefs::{EXTENSION, SETTINGS_LOCATION, TableFileWriter, TableSet};

use crate::error::*;
use crate::registry::{Mapper, MapperFactory, MapperRegistry, prepare_all};
use crate::spec::MapperSpec;

/// Outcome for one input of a batch
#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub result: Result<()>,
}

/// Per-file results of [`Pipeline::map_multi`], in input order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}

/// Output path for `input` in a batch tagged `tag`: `run1.tbl` with tag
/// `cal` becomes `run1.cal.tbl` in the same directory.
pub fn output_name(input: &Path, tag: &str) -> Result<PathBuf> {
    if tag.is_empty() || tag.contains(['/', '\\']) || tag.chars().any(char::is_whitespace) {
        return Err(Error::InvalidTag(tag.to_string()));
    }
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(EXTENSION).unwrap_or(&name);
    Ok(input.with_file_name(format!("{stem}.{tag}{EXTENSION}")))
}

/// Run `stages` in order. The first stage sees every input, later stages
/// see the previous stage's output.
pub fn run_stages(
    stages: &[Arc<dyn Mapper>],
    inputs: Vec<TableSet>,
    settings: &mut Settings,
    label: &str,
) -> Result<TableSet> {
    let mut current = inputs;
    let mut output = TableSet::new();
    for stage in stages {
        debug!("Running stage {stage} on {label}", stage: stage.name(), label);
        output = stage
            .apply(current, settings)
            .map_err(|e| e.into_error(stage.name(), label))?;
        current = vec![output.clone()];
    }
    Ok(output)
}

/// Write tables plus settings into `output`. Nothing is left behind when
/// any step fails.
pub fn write_output(output: &Path, tables: &TableSet, settings: &Settings) -> Result<()> {
    let mut writer = TableFileWriter::create(output)?;
    tables.write_to(&mut writer)?;
    settings.write_to(&mut writer, SETTINGS_LOCATION)?;
    let _ = writer.finish()?;
    Ok(())
}

fn map_file(
    stages: &[Arc<dyn Mapper>],
    input: &Path,
    output: &Path,
    mut settings: Settings,
) -> Result<()> {
    let label = input.display().to_string();
    let tables = TableSet::load(input)?;
    let result = run_stages(stages, vec![tables], &mut settings, &label)?;
    write_output(output, &result, &settings)?;
    info!(
        "Mapped {input} to {output}",
        input: label,
        output: output.display().to_string()
    );
    Ok(())
}

/// Applies mapper lists using the stages of one registry
#[derive(Debug, Clone)]
pub struct Pipeline {
    registry: MapperRegistry,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(MapperRegistry::with_builtin())
    }
}

impl Pipeline {
    #[must_use]
    pub fn new(registry: MapperRegistry) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &MapperRegistry {
        &self.registry
    }

    fn prepare(&self, spec: &MapperSpec) -> Result<Vec<Arc<dyn Mapper>>> {
        prepare_all(&self.registry.resolve(spec)?)
    }

    /// Map one file into `output`
    pub fn map_single(
        &self,
        input: &Path,
        spec: &MapperSpec,
        output: &Path,
        settings: &Settings,
    ) -> Result<()> {
        let stages = self.prepare(spec)?;
        map_file(&stages, input, output, settings.clone())
    }

    /// Map each input independently into `<stem>.<tag>.tbl` beside it.
    ///
    /// Files run concurrently on blocking worker tasks, each with its own
    /// copy of `settings`. With `reuse_compiled` the stages are prepared
    /// once and shared; otherwise every file prepares its own. Per-file
    /// failures are reported in the returned [`BatchReport`]; only an
    /// unusable mapper list or tag fails the whole call.
    pub async fn map_multi(
        &self,
        inputs: &[PathBuf],
        spec: &MapperSpec,
        tag: &str,
        reuse_compiled: bool,
        settings: &Settings,
    ) -> Result<BatchReport> {
        let factories: Arc<Vec<MapperFactory>> = Arc::new(self.registry.resolve(spec)?);
        let shared = if reuse_compiled {
            Some(Arc::new(prepare_all(&factories)?))
        } else {
            None
        };

        let mut outputs = Vec::with_capacity(inputs.len());
        for input in inputs {
            outputs.push(output_name(input, tag)?);
        }

        let tasks = inputs.iter().zip(&outputs).map(|(input, output)| {
            let input = input.clone();
            let output = output.clone();
            let settings = settings.clone();
            let factories = factories.clone();
            let shared = shared.clone();
            tokio::task::spawn_blocking(move || {
                let stages = match shared {
                    Some(stages) => stages,
                    None => Arc::new(prepare_all(&factories)?),
                };
                map_file(&stages, &input, &output, settings)
            })
        });
        let results = futures::future::join_all(tasks).await;

        let outcomes: Vec<FileOutcome> = inputs
            .iter()
            .zip(outputs)
            .zip(results)
            .map(|((input, output), joined)| {
                let result = joined.map_err(Error::from).and_then(|r| r);
                if let Err(e) = &result {
                    warn!(
                        "Mapping {input} failed: {error}",
                        input: input.display().to_string(),
                        error: e.to_string()
                    );
                }
                FileOutcome {
                    input: input.clone(),
                    output,
                    result,
                }
            })
            .collect();

        let report = BatchReport { outcomes };
        info!(
            "Batch finished: {ok} of {total} files mapped",
            ok: report.succeeded().count(),
            total: report.outcomes.len()
        );
        Ok(report)
    }

    /// Combine all inputs into one `output`
    pub fn reduce(
        &self,
        inputs: &[PathBuf],
        spec: &MapperSpec,
        output: &Path,
        settings: &Settings,
    ) -> Result<()> {
        let stages = self.prepare(spec)?;
        let tables = inputs
            .iter()
            .map(TableSet::load)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut settings = settings.clone();
        let label = format!("{} inputs", inputs.len());
        let result = run_stages(&stages, tables, &mut settings, &label)?;
        write_output(output, &result, &settings)?;
        info!(
            "Reduced {count} inputs into {output}",
            count: inputs.len(),
            output: output.display().to_string()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StageFailure;
    use crate::registry::MapperFactory;
    use crate::stages::test_utils::pulses;
    use tablefs::TableFile;

    fn write_input(path: &Path, channels: &[i32], energies: &[f64]) {
        let mut set = TableSet::new();
        set.insert("evt", pulses(channels, energies));
        let mut writer = TableFileWriter::create(path).unwrap();
        set.write_to(&mut writer).unwrap();
        writer.finish().unwrap();
    }

    struct Failing;

    impl Mapper for Failing {
        fn name(&self) -> &str {
            "fail"
        }

        fn apply(
            &self,
            _inputs: Vec<TableSet>,
            _settings: &mut Settings,
        ) -> std::result::Result<TableSet, StageFailure> {
            Err(StageFailure::failed("detector on fire"))
        }
    }

    fn prepare_failing() -> std::result::Result<Arc<dyn Mapper>, StageFailure> {
        Ok(Arc::new(Failing))
    }

    fn pipeline_with_failing() -> Pipeline {
        let mut registry = MapperRegistry::with_builtin();
        registry.register(MapperFactory {
            name: "fail",
            description: "Always fails",
            prepare: prepare_failing,
        });
        Pipeline::new(registry)
    }

    #[test]
    fn test_output_name() {
        assert_eq!(
            output_name(Path::new("data/run1.tbl"), "cal").unwrap(),
            PathBuf::from("data/run1.cal.tbl")
        );
        assert_eq!(
            output_name(Path::new("run1.x.tbl"), "y").unwrap(),
            PathBuf::from("run1.x.y.tbl")
        );
        assert!(output_name(Path::new("run1.tbl"), "").is_err());
        assert!(output_name(Path::new("run1.tbl"), "a/b").is_err());
    }

    #[test]
    fn test_map_single_embeds_settings() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("run1.tbl");
        let output = dir.path().join("out.tbl");
        write_input(&input, &[1, 2], &[1.0, 2.0]);

        let mut base = Settings::new();
        base.set("scale.factor", 10.0).unwrap();
        let spec = MapperSpec::parse("copy,scale").unwrap();
        Pipeline::default()
            .map_single(&input, &spec, &output, &base)
            .unwrap();

        let file = TableFile::open(&output).unwrap();
        assert_eq!(
            file.read_table("evt").unwrap(),
            pulses(&[1, 2], &[10.0, 20.0])
        );
        let embedded = Settings::get_from(&file, SETTINGS_LOCATION).unwrap().unwrap();
        assert_eq!(embedded.lookup::<f64>("scale.factor").unwrap(), Some(10.0));
        assert_eq!(
            embedded.lookup::<String>("scale.columns").unwrap(),
            Some(String::new())
        );
        // The caller's settings are not modified.
        assert!(base.lookup::<String>("scale.columns").unwrap().is_none());
    }

    #[test]
    fn test_unknown_mapper_does_no_work() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("run1.tbl");
        let output = dir.path().join("out.tbl");
        write_input(&input, &[1], &[1.0]);

        let spec = MapperSpec::parse("copy,nonexistent").unwrap();
        let err = Pipeline::default()
            .map_single(&input, &spec, &output, &Settings::new())
            .unwrap_err();
        assert!(matches!(err, Error::MapperNotFound(ref n) if n == "nonexistent"));
        assert!(!output.exists());
    }

    #[test]
    fn test_stage_failure_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("run1.tbl");
        let output = dir.path().join("out.tbl");
        write_input(&input, &[1], &[1.0]);
        let before = std::fs::read(&input).unwrap();

        let spec = MapperSpec::parse("copy,fail").unwrap();
        let err = pipeline_with_failing()
            .map_single(&input, &spec, &output, &Settings::new())
            .unwrap_err();
        assert!(matches!(err, Error::Stage { ref stage, .. } if stage == "fail"));
        assert!(!output.exists());
        assert_eq!(std::fs::read(&input).unwrap(), before);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_map_multi_matches_solo_runs() {
        let dir = tempfile::tempdir().unwrap();
        let inputs: Vec<PathBuf> = (0..3)
            .map(|i| {
                let path = dir.path().join(format!("run{i}.tbl"));
                write_input(&path, &[i, i + 1], &[f64::from(i), 0.5]);
                path
            })
            .collect();

        let mut base = Settings::new();
        base.set("scale.factor", 3.0).unwrap();
        let spec = MapperSpec::parse("scale,sum").unwrap();
        let pipeline = Pipeline::default();

        for reuse in [true, false] {
            let report = pipeline
                .map_multi(&inputs, &spec, "m", reuse, &base)
                .await
                .unwrap();
            assert!(report.is_success());
            assert_eq!(report.outcomes.len(), 3);

            for outcome in &report.outcomes {
                let solo = dir.path().join("solo.tbl");
                pipeline
                    .map_single(&outcome.input, &spec, &solo, &base)
                    .unwrap();
                assert_eq!(
                    std::fs::read(&outcome.output).unwrap(),
                    std::fs::read(&solo).unwrap()
                );
                std::fs::remove_file(&solo).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_map_multi_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.tbl");
        write_input(&good, &[1], &[1.0]);
        let bad = dir.path().join("bad.tbl");
        std::fs::write(&bad, b"garbage that is not a table file").unwrap();

        let report = Pipeline::default()
            .map_multi(
                &[bad.clone(), good.clone()],
                &MapperSpec::parse("copy").unwrap(),
                "out",
                true,
                &Settings::new(),
            )
            .await
            .unwrap();

        assert!(!report.is_success());
        let failed: Vec<_> = report.failures().map(|o| o.input.clone()).collect();
        assert_eq!(failed, vec![bad]);
        assert!(dir.path().join("good.out.tbl").exists());
        assert!(!dir.path().join("bad.out.tbl").exists());
    }

    #[test]
    fn test_reduce_order_invariant_for_sum() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.tbl");
        let b = dir.path().join("b.tbl");
        write_input(&a, &[1, 2, 3], &[0.1, 0.2, 0.3]);
        write_input(&b, &[4], &[0.4]);

        let spec = MapperSpec::parse("sum").unwrap();
        let pipeline = Pipeline::default();
        let ab = dir.path().join("ab.tbl");
        let ba = dir.path().join("ba.tbl");
        pipeline
            .reduce(&[a.clone(), b.clone()], &spec, &ab, &Settings::new())
            .unwrap();
        pipeline.reduce(&[b, a], &spec, &ba, &Settings::new()).unwrap();

        assert_eq!(TableSet::load(&ab).unwrap(), TableSet::load(&ba).unwrap());
        let sums = TableSet::load(&ab).unwrap();
        assert_eq!(sums.get("evt").unwrap().num_rows(), 1);
    }

    #[test]
    fn test_reduce_feeds_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.tbl");
        let b = dir.path().join("b.tbl");
        write_input(&a, &[1], &[1.0]);
        write_input(&b, &[2], &[2.0]);

        let mut settings = Settings::new();
        settings.set("scale.factor", 2.0).unwrap();
        let out = dir.path().join("out.tbl");
        Pipeline::default()
            .reduce(
                &[a, b],
                &MapperSpec::parse("copy,scale").unwrap(),
                &out,
                &settings,
            )
            .unwrap();

        let file = TableFile::open(&out).unwrap();
        assert_eq!(
            file.read_table("evt").unwrap(),
            pulses(&[1, 2], &[2.0, 4.0])
        );
    }
}
