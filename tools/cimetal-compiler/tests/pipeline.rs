//! Pipeline behaviour against a scripted toolchain runner.
//!
//! The runner writes whatever file follows `-o`, so cache contents on disk
//! match what a real xcrun run would leave behind.

use std::io;
use std::path::{Path, PathBuf};

use cimetal_compiler::{
    Pipeline, PipelineError, PipelineRequest, StageKind, ToolExit, ToolInvocation, ToolRunner,
    Xcrun,
};
use tempfile::tempdir;

#[derive(Default)]
struct ScriptedRunner {
    calls: Vec<Vec<String>>,
    /// (1-based call number, exit code) of a failing call
    fail_call: Option<(usize, i32)>,
    launch_fails: bool,
    /// For the merge call: whether each input existed on disk when it ran
    merge_inputs_present: Vec<bool>,
}

impl ScriptedRunner {
    fn failing_at(call: usize, code: i32) -> Self {
        Self {
            fail_call: Some((call, code)),
            ..Default::default()
        }
    }

    fn subcommand(&self, i: usize) -> (&str, &str) {
        (self.calls[i][0].as_str(), self.calls[i][1].as_str())
    }
}

impl ToolRunner for ScriptedRunner {
    fn run(&mut self, invocation: &ToolInvocation) -> io::Result<ToolExit> {
        if self.launch_fails {
            return Err(io::Error::new(io::ErrorKind::NotFound, "xcrun not found"));
        }
        let args: Vec<String> = invocation
            .args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        let is_merge = args[0] == "metal" && args[1] == "-fcikernel";
        if is_merge {
            self.merge_inputs_present = args[4..].iter().map(|a| Path::new(a).exists()).collect();
        }
        self.calls.push(args);

        if let Some((call, code)) = self.fail_call {
            if call == self.calls.len() {
                return Ok(ToolExit::from_code(code));
            }
        }
        if let Some(out) = invocation.output_arg() {
            std::fs::write(out, b"artifact")?;
        }
        Ok(ToolExit::SUCCESS)
    }
}

fn request(dir: &Path, names: &[&str]) -> PipelineRequest {
    let src = dir.join("src");
    std::fs::create_dir_all(&src).unwrap();
    let inputs = names
        .iter()
        .map(|n| {
            let p = src.join(n);
            std::fs::write(&p, "kernel").unwrap();
            p
        })
        .collect();
    PipelineRequest {
        output: dir.join("out.metallib"),
        cache: dir.join("cache"),
        inputs,
    }
}

fn pipeline(runner: ScriptedRunner) -> Pipeline<Xcrun, ScriptedRunner> {
    Pipeline::new(Xcrun::new("/usr/bin/xcrun"), runner)
}

#[test]
fn test_successful_run_merges_intermediates_in_order() {
    let dir = tempdir().unwrap();
    let req = request(dir.path(), &["a.metal", "b.metal"]);
    let cache = req.cache.clone();

    let mut pipe = pipeline(ScriptedRunner::default());
    let report = pipe.run(&req).unwrap();
    let runner = pipe.into_runner();

    let expected_air = vec![cache.join("a.air"), cache.join("b.air")];
    assert_eq!(report.intermediates, expected_air);
    assert_eq!(
        report.unit_libraries,
        vec![cache.join("a.metallib"), cache.join("b.metallib")]
    );
    assert_eq!(report.output, dir.path().join("out.metallib"));

    // 2 compiles, 2 links, 1 merge
    assert_eq!(runner.calls.len(), 5);
    assert_eq!(runner.subcommand(0), ("metal", "-c"));
    assert_eq!(runner.subcommand(1), ("metal", "-c"));
    assert_eq!(runner.subcommand(2), ("metallib", "--cikernel"));
    assert_eq!(runner.subcommand(3), ("metallib", "--cikernel"));
    assert_eq!(runner.subcommand(4), ("metal", "-fcikernel"));

    let merge = &runner.calls[4];
    let merge_inputs: Vec<PathBuf> = merge[4..].iter().map(PathBuf::from).collect();
    assert_eq!(merge_inputs, expected_air);
    assert_eq!(runner.merge_inputs_present, vec![true, true]);
    assert!(dir.path().join("out.metallib").exists());
}

#[test]
fn test_cache_directory_created_recursively() {
    let dir = tempdir().unwrap();
    let mut req = request(dir.path(), &["a.metal"]);
    req.cache = dir.path().join("deep/nested/cache");

    pipeline(ScriptedRunner::default()).run(&req).unwrap();
    assert!(req.cache.join("a.air").exists());
}

#[test]
fn test_compile_failure_on_second_input_stops_pipeline() {
    let dir = tempdir().unwrap();
    let req = request(dir.path(), &["a.metal", "b.metal", "c.metal"]);

    let mut pipe = pipeline(ScriptedRunner::failing_at(2, 65));
    let err = pipe.run(&req).unwrap_err();
    let runner = pipe.into_runner();

    match &err {
        PipelineError::Stage {
            stage,
            index,
            total,
            input,
            exit,
            ..
        } => {
            assert_eq!(*stage, StageKind::Compile);
            assert_eq!(*index, 2);
            assert_eq!(*total, 3);
            assert_eq!(input.as_deref(), Some(req.inputs[1].as_path()));
            assert_eq!(*exit, ToolExit::from_code(65));
        }
        other => panic!("unexpected error: {other}"),
    }
    let msg = err.to_string();
    assert!(msg.contains("input #2 of 3"));
    assert!(msg.contains("Exit code: 65"));

    // No link or merge call happened
    assert_eq!(runner.calls.len(), 2);
    assert!(runner.calls.iter().all(|c| c[0] == "metal" && c[1] == "-c"));
    assert!(!dir.path().join("out.metallib").exists());
}

#[test]
fn test_link_failure_skips_merge() {
    let dir = tempdir().unwrap();
    let req = request(dir.path(), &["a.metal", "b.metal"]);

    // Calls: compile a, compile b, link a (fails)
    let mut pipe = pipeline(ScriptedRunner::failing_at(3, 1));
    let err = pipe.run(&req).unwrap_err();
    let runner = pipe.into_runner();

    assert!(matches!(
        err,
        PipelineError::Stage { stage: StageKind::Link, index: 1, .. }
    ));
    assert_eq!(runner.calls.len(), 3);
    assert!(!dir.path().join("out.metallib").exists());
}

#[test]
fn test_merge_failure_is_reported() {
    let dir = tempdir().unwrap();
    let req = request(dir.path(), &["a.metal"]);

    let err = pipeline(ScriptedRunner::failing_at(3, 2)).run(&req).unwrap_err();
    assert!(matches!(err, PipelineError::Stage { stage: StageKind::Merge, .. }));
    assert!(err.to_string().contains("Failed to merge 1 AIR file(s)"));
}

#[test]
fn test_launch_failure_is_distinct_from_stage_failure() {
    let dir = tempdir().unwrap();
    let req = request(dir.path(), &["a.metal"]);
    let runner = ScriptedRunner {
        launch_fails: true,
        ..Default::default()
    };

    let err = pipeline(runner).run(&req).unwrap_err();
    match err {
        PipelineError::Launch { stage, program, .. } => {
            assert_eq!(stage, StageKind::Compile);
            assert_eq!(program, PathBuf::from("/usr/bin/xcrun"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_prepare_failure_aborts_before_any_tool_call() {
    let dir = tempdir().unwrap();
    let mut req = request(dir.path(), &["a.metal"]);
    // A regular file where the cache directory should go
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();
    req.cache = blocker.join("cache");

    let mut pipe = pipeline(ScriptedRunner::default());
    let err = pipe.run(&req).unwrap_err();
    assert!(matches!(err, PipelineError::Prepare { .. }));
    assert!(pipe.into_runner().calls.is_empty());
}

#[test]
fn test_name_collision_rejected_before_any_tool_call() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("one/Blur.metal");
    let second = dir.path().join("two/Blur.metal");
    for p in [&first, &second] {
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(p, "kernel").unwrap();
    }
    let req = PipelineRequest {
        output: dir.path().join("out.metallib"),
        cache: dir.path().join("cache"),
        inputs: vec![first, second],
    };

    let mut pipe = pipeline(ScriptedRunner::default());
    let err = pipe.run(&req).unwrap_err();
    assert!(matches!(err, PipelineError::NameCollision { ref stem, .. } if stem == "Blur"));
    assert!(pipe.into_runner().calls.is_empty());
    assert!(!dir.path().join("cache").exists());
}

#[test]
fn test_empty_inputs_rejected() {
    let dir = tempdir().unwrap();
    let req = PipelineRequest {
        output: dir.path().join("out.metallib"),
        cache: dir.path().join("cache"),
        inputs: Vec::new(),
    };
    let err = pipeline(ScriptedRunner::default()).run(&req).unwrap_err();
    assert!(matches!(err, PipelineError::NoInputs));
}

#[test]
fn test_rerun_over_populated_cache_is_idempotent() {
    let dir = tempdir().unwrap();
    let req = request(dir.path(), &["a.metal", "b.metal"]);
    std::fs::create_dir_all(&req.cache).unwrap();
    std::fs::write(req.cache.join("unrelated.air"), "stale").unwrap();
    std::fs::write(req.cache.join("a.air"), "old").unwrap();

    let first = pipeline(ScriptedRunner::default()).run(&req).unwrap();
    let second = pipeline(ScriptedRunner::default()).run(&req).unwrap();

    assert_eq!(first, second);
    assert_eq!(std::fs::read(req.cache.join("a.air")).unwrap(), b"artifact");
    // Stale files are left alone
    assert!(req.cache.join("unrelated.air").exists());
}

#[test]
fn test_repeated_input_is_compiled_and_merged_once() {
    let dir = tempdir().unwrap();
    let mut req = request(dir.path(), &["a.metal", "b.metal"]);
    req.inputs.push(req.inputs[0].clone());

    let mut pipe = pipeline(ScriptedRunner::default());
    let report = pipe.run(&req).unwrap();
    assert_eq!(
        report.intermediates,
        vec![req.cache.join("a.air"), req.cache.join("b.air")]
    );

    let runner = pipe.into_runner();
    assert_eq!(runner.calls.len(), 5);
    let merge = &runner.calls[4];
    assert_eq!(
        merge[4..],
        [
            req.cache.join("a.air").display().to_string(),
            req.cache.join("b.air").display().to_string(),
        ]
    );
}
