//! 以 shell 腳本模擬外部轉換程式的整合測試

#![cfg(unix)]

use std::collections::HashSet;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use ebook_batch_convert::config::config::OutputLayout;
use ebook_batch_convert::facade::conversion_facade::ConversionFacade;
use ebook_batch_convert::facade::traits::i_conversion::ConversionFacadeTrait;
use ebook_batch_convert::models::conversion::{
    ConversionInput, ConversionResult, ConvertBatchInput, ConverterCommand,
};
use ebook_batch_convert::models::file::FileCollectInput;
use ebook_batch_convert::service::convert::{plan_tasks, ConvertService};
use ebook_batch_convert::service::file::FileService;
use ebook_batch_convert::service::traits::i_service::{ConvertServiceTrait, FileServiceTrait};
use tempfile::tempdir;

const SUCCEED: &str = "echo placeholder > \"$2\"\n";

const FAIL_ON_BAD: &str = r#"case "$1" in
  *bad.epub) echo "disk full" >&2; exit 1 ;;
esac
echo placeholder > "$2"
"#;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"epub").unwrap();
}

fn run_batch(
    files: &[PathBuf],
    root: &Path,
    out: &Path,
    converter: ConverterCommand,
    workers: usize,
) -> Vec<ConversionResult> {
    let tasks = plan_tasks(files, root, out, OutputLayout::Flat, ".epub", ".mobi");
    let mut results = Vec::new();
    let output = ConvertService::new()
        .convert_files(
            ConvertBatchInput { tasks, converter, workers },
            &mut |result: &ConversionResult| results.push(result.clone()),
        )
        .unwrap();
    assert_eq!(output.succeeded + output.failed, results.len());
    results
}

fn conversion_input(root: &Path, out: &Path, program: PathBuf) -> ConversionInput {
    ConversionInput {
        input_path: root.to_path_buf(),
        output_dir: out.to_path_buf(),
        source_ext: ".epub".to_string(),
        target_ext: ".mobi".to_string(),
        converter: ConverterCommand::new(program),
        workers: 4,
        layout: OutputLayout::Flat,
        no_progress: true,
    }
}

fn facade() -> ConversionFacade {
    ConversionFacade::new(Box::new(FileService::new()), Box::new(ConvertService::new()))
}

#[test]
fn collects_only_matching_files() {
    let dir = tempdir().unwrap();
    let books = dir.path().join("books");
    touch(&books.join("a.epub"));
    touch(&books.join("sub/b.epub"));
    touch(&books.join("c.txt"));

    let output = FileService::new()
        .collect_files(FileCollectInput {
            input_path: books.clone(),
            source_ext: ".epub".to_string(),
        })
        .unwrap();

    let found: HashSet<PathBuf> = output.files.into_iter().collect();
    let expected: HashSet<PathBuf> = [books.join("a.epub"), books.join("sub/b.epub")].into_iter().collect();
    assert_eq!(found, expected);
}

#[test]
fn successful_conversions_reference_flat_outputs() {
    let dir = tempdir().unwrap();
    let books = dir.path().join("books");
    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    let files = vec![books.join("a.epub"), books.join("b.epub")];
    files.iter().for_each(|f| touch(f));
    let script = write_script(dir.path(), "ok.sh", SUCCEED);

    let results = run_batch(&files, &books, &out, ConverterCommand::new(script), 2);

    let outputs: HashSet<PathBuf> = results
        .iter()
        .map(|r| match r {
            ConversionResult::Success { output, .. } => output.clone(),
            other => panic!("unexpected failure: {:?}", other),
        })
        .collect();
    let expected: HashSet<PathBuf> = [out.join("a.mobi"), out.join("b.mobi")].into_iter().collect();
    assert_eq!(outputs, expected);
    assert!(out.join("a.mobi").is_file());
    assert!(out.join("b.mobi").is_file());
}

#[test]
fn failing_task_is_isolated() {
    let dir = tempdir().unwrap();
    let books = dir.path().join("books");
    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    let files = vec![books.join("first.epub"), books.join("bad.epub"), books.join("last.epub")];
    files.iter().for_each(|f| touch(f));
    let script = write_script(dir.path(), "fail.sh", FAIL_ON_BAD);

    let results = run_batch(&files, &books, &out, ConverterCommand::new(script), 3);

    assert_eq!(results.len(), 3);
    let sources: HashSet<&PathBuf> = results.iter().map(|r| r.source()).collect();
    assert_eq!(sources.len(), 3);

    let bad = results.iter().find(|r| r.source() == &books.join("bad.epub")).unwrap();
    assert_eq!(
        bad,
        &ConversionResult::Failure {
            source: books.join("bad.epub"),
            diagnostic: "disk full".to_string(),
        }
    );
    for name in ["first.epub", "last.epub"] {
        let result = results.iter().find(|r| r.source() == &books.join(name)).unwrap();
        assert!(result.is_success(), "{} should succeed: {:?}", name, result);
    }
}

#[test]
fn never_exceeds_worker_limit() {
    let dir = tempdir().unwrap();
    let books = dir.path().join("books");
    let out = dir.path().join("out");
    let running = dir.path().join("running");
    let counts = dir.path().join("counts.log");
    fs::create_dir_all(&out).unwrap();
    fs::create_dir_all(&running).unwrap();

    let body = format!(
        r#"touch "{running}/$$"
ls "{running}" | wc -l >> "{counts}"
sleep 0.5
rm -f "{running}/$$"
echo placeholder > "$2"
"#,
        running = running.display(),
        counts = counts.display()
    );
    let script = write_script(dir.path(), "count.sh", &body);
    let files: Vec<PathBuf> = (0..12).map(|i| books.join(format!("book{}.epub", i))).collect();
    files.iter().for_each(|f| touch(f));

    let workers = 3;
    let start = Instant::now();
    let results = run_batch(&files, &books, &out, ConverterCommand::new(script), workers);
    let elapsed = start.elapsed();
    assert_eq!(results.len(), files.len());
    assert!(results.iter().all(|r| r.is_success()));

    let observed: Vec<usize> = fs::read_to_string(&counts)
        .unwrap()
        .lines()
        .map(|line| line.trim().parse().unwrap())
        .collect();
    assert_eq!(observed.len(), files.len());
    let peak = observed.into_iter().max().unwrap();
    assert!(peak >= 1 && peak <= workers, "peak concurrency {} exceeds {}", peak, workers);
    // 依序執行需 12 × 0.5 = 6 秒，3 個並行約 2 秒
    assert!(elapsed < Duration::from_millis(4500), "pool did not run tasks in parallel: {:?}", elapsed);
}

#[test]
fn results_arrive_in_completion_order() {
    let dir = tempdir().unwrap();
    let books = dir.path().join("books");
    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    let body = r#"case "$1" in
  *slow.epub) sleep 1 ;;
esac
echo placeholder > "$2"
"#;
    let script = write_script(dir.path(), "order.sh", body);
    let files = vec![books.join("slow.epub"), books.join("fast.epub")];
    files.iter().for_each(|f| touch(f));

    let results = run_batch(&files, &books, &out, ConverterCommand::new(script), 2);
    assert_eq!(results[0].source(), &books.join("fast.epub"));
    assert_eq!(results[1].source(), &books.join("slow.epub"));
}

#[test]
fn missing_binary_fails_every_task_without_aborting() {
    let dir = tempdir().unwrap();
    let books = dir.path().join("books");
    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    let files = vec![books.join("a.epub"), books.join("b.epub"), books.join("c.epub")];
    files.iter().for_each(|f| touch(f));

    let converter = ConverterCommand::new(dir.path().join("no-such-converter"));
    let results = run_batch(&files, &books, &out, converter, 2);

    assert_eq!(results.len(), 3);
    for result in &results {
        match result {
            ConversionResult::Failure { diagnostic, .. } => assert!(diagnostic.contains("no-such-converter")),
            other => panic!("unexpected success: {:?}", other),
        }
    }
}

#[test]
fn hung_converter_is_killed_after_timeout() {
    let dir = tempdir().unwrap();
    let books = dir.path().join("books");
    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    let files = vec![books.join("stuck.epub")];
    files.iter().for_each(|f| touch(f));
    let script = write_script(dir.path(), "hang.sh", "exec sleep 30\n");

    let converter = ConverterCommand {
        program: script,
        extra_args: Vec::new(),
        timeout: Some(Duration::from_secs(1)),
    };
    let start = Instant::now();
    let results = run_batch(&files, &books, &out, converter, 1);
    assert!(start.elapsed() < Duration::from_secs(10));

    match &results[0] {
        ConversionResult::Failure { diagnostic, .. } => assert!(diagnostic.contains("逾時"), "{}", diagnostic),
        other => panic!("unexpected success: {:?}", other),
    }
}

#[test]
fn background_child_holding_pipes_cannot_outlive_timeout() {
    let dir = tempdir().unwrap();
    let books = dir.path().join("books");
    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    let files = vec![books.join("detached.epub")];
    files.iter().for_each(|f| touch(f));
    // 轉換程式立即成功結束，但背景行程繼承了 stdout/stderr
    let script = write_script(dir.path(), "detach.sh", "sleep 6 &\nexit 0\n");

    let converter = ConverterCommand {
        program: script,
        extra_args: Vec::new(),
        timeout: Some(Duration::from_secs(1)),
    };
    let start = Instant::now();
    let results = run_batch(&files, &books, &out, converter, 1);
    assert!(start.elapsed() < Duration::from_secs(4), "worker held for {:?}", start.elapsed());

    match &results[0] {
        ConversionResult::Failure { diagnostic, .. } => assert!(diagnostic.contains("逾時"), "{}", diagnostic),
        other => panic!("unexpected success: {:?}", other),
    }
}

#[test]
fn extra_arguments_follow_output_path() {
    let dir = tempdir().unwrap();
    let books = dir.path().join("books");
    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    let files = vec![books.join("a.epub")];
    files.iter().for_each(|f| touch(f));
    let script = write_script(dir.path(), "args.sh", "echo \"$3 $4\" > \"$2\"\n");

    let converter = ConverterCommand {
        program: script,
        extra_args: vec!["--output-profile".to_string(), "kindle".to_string()],
        timeout: Some(Duration::from_secs(30)),
    };
    let results = run_batch(&files, &books, &out, converter, 1);
    assert!(results[0].is_success());
    let written = fs::read_to_string(out.join("a.mobi")).unwrap();
    assert_eq!(written.trim(), "--output-profile kindle");
}

#[test]
fn facade_summarises_mixed_run() {
    let dir = tempdir().unwrap();
    let books = dir.path().join("books");
    let out = dir.path().join("out");
    touch(&books.join("good.epub"));
    touch(&books.join("sub/bad.epub"));
    touch(&books.join("notes.txt"));
    let script = write_script(dir.path(), "fail.sh", FAIL_ON_BAD);

    let output = facade().execute_conversion(conversion_input(&books, &out, script)).unwrap();
    assert_eq!(output.total, 2);
    assert_eq!(output.succeeded, 1);
    assert_eq!(output.failed, 1);
    assert!(output.has_failures());
    assert!(out.join("good.mobi").is_file());
}

#[test]
fn facade_mirror_layout_avoids_collisions() {
    let dir = tempdir().unwrap();
    let books = dir.path().join("books");
    let out = dir.path().join("out");
    touch(&books.join("x/a.epub"));
    touch(&books.join("y/a.epub"));
    let script = write_script(dir.path(), "ok.sh", SUCCEED);

    let mut input = conversion_input(&books, &out, script);
    input.layout = OutputLayout::Mirror;
    let output = facade().execute_conversion(input).unwrap();
    assert_eq!(output.succeeded, 2);
    assert!(out.join("x/a.mobi").is_file());
    assert!(out.join("y/a.mobi").is_file());
}

#[test]
fn facade_stops_on_missing_root() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out");
    let script = write_script(dir.path(), "ok.sh", SUCCEED);

    let err = facade()
        .execute_conversion(conversion_input(&dir.path().join("missing"), &out, script))
        .unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    assert!(!out.exists());
}

#[test]
fn facade_handles_empty_tree() {
    let dir = tempdir().unwrap();
    let books = dir.path().join("books");
    fs::create_dir_all(&books).unwrap();
    touch(&books.join("readme.txt"));
    let script = write_script(dir.path(), "ok.sh", SUCCEED);

    let output = facade()
        .execute_conversion(conversion_input(&books, &dir.path().join("out"), script))
        .unwrap();
    assert_eq!(output.total, 0);
    assert!(!output.has_failures());
}
