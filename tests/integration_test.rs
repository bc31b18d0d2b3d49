//! End-to-end tests driving the `shortmap` binary the way the design's §8
//! concrete scenarios describe: batch-splitting arithmetic and cross-run
//! order stability under differing worker counts.

use assert_cmd::Command;
use std::fs;
use std::io::Write;

fn write_reads(contents: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    f.flush().unwrap();
    f
}

#[test]
fn unpaired_single_threaded_batches_concatenate_in_order() {
    // Scenario 1: 5 reads, batch_limit=2, start=1..end=3 -> 3 batches of
    // sizes {2,2,1}, output is oids 0,1,2 concatenated in order.
    let input = write_reads("AAAA\nCCCC\nGGGG\nTTTT\nACGT\n");
    let out = tempfile::NamedTempFile::new().unwrap();
    let temp_dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("shortmap").unwrap();
    cmd.arg("--input")
        .arg(input.path())
        .arg("--index")
        .arg("/nonexistent-index-base")
        .arg("--output")
        .arg(out.path())
        .arg("--temp-dir")
        .arg(temp_dir.path())
        .arg("--unpaired")
        .arg("--batch-size")
        .arg("2")
        .arg("--start-batch")
        .arg("1")
        .arg("--end-batch")
        .arg("3")
        .arg("--threads")
        .arg("1")
        .assert()
        .success();

    let text = fs::read_to_string(out.path()).unwrap();
    let qids: Vec<u64> = text
        .lines()
        .map(|l| l.split('\t').next().unwrap().parse().unwrap())
        .collect();
    assert_eq!(qids, vec![0, 1, 2, 3, 4]);

    // Temp directory is empty of driver-created files once `run()` returns.
    let leftover: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
    assert!(leftover.is_empty(), "temp dir not cleaned: {leftover:?}");
}

#[test]
fn start_batch_above_one_skips_earlier_batches_without_consuming_their_reads() {
    // --start-batch 3 --end-batch 3 --batch-size 2 over 5 reads must skip
    // batches 1 and 2 (4 reads: AAAA,CCCC,GGGG,TTTT) and process only
    // batch 3 (the 5th read, ACGT) -- not mislabel the *first* 2 reads as
    // batch 3.
    let input = write_reads("AAAA\nCCCC\nGGGG\nTTTT\nACGT\n");
    let out = tempfile::NamedTempFile::new().unwrap();
    let temp_dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("shortmap")
        .unwrap()
        .arg("--input")
        .arg(input.path())
        .arg("--index")
        .arg("/nonexistent-index-base")
        .arg("--output")
        .arg(out.path())
        .arg("--temp-dir")
        .arg(temp_dir.path())
        .arg("--unpaired")
        .arg("--batch-size")
        .arg("2")
        .arg("--start-batch")
        .arg("3")
        .arg("--end-batch")
        .arg("3")
        .arg("--threads")
        .arg("1")
        .assert()
        .success();

    let text = fs::read_to_string(out.path()).unwrap();
    let qids: Vec<u64> = text
        .lines()
        .map(|l| l.split('\t').next().unwrap().parse().unwrap())
        .collect();
    assert_eq!(qids, vec![4]);

    let leftover: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
    assert!(leftover.is_empty(), "temp dir not cleaned: {leftover:?}");
}

#[test]
fn start_batch_above_one_skips_earlier_batches_multi_threaded() {
    // Same scenario as above, but through the multi-threaded scheduling
    // path: skipped batches must not fabricate empty temp files for the
    // oids below start_batch, and the surviving batch must still land on
    // the correct slice of the input.
    let input = write_reads("AAAA\nCCCC\nGGGG\nTTTT\nACGT\n");
    let out = tempfile::NamedTempFile::new().unwrap();
    let temp_dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("shortmap")
        .unwrap()
        .arg("--input")
        .arg(input.path())
        .arg("--index")
        .arg("/nonexistent-index-base")
        .arg("--output")
        .arg(out.path())
        .arg("--temp-dir")
        .arg(temp_dir.path())
        .arg("--unpaired")
        .arg("--batch-size")
        .arg("2")
        .arg("--start-batch")
        .arg("3")
        .arg("--end-batch")
        .arg("3")
        .arg("--threads")
        .arg("4")
        .assert()
        .success();

    let text = fs::read_to_string(out.path()).unwrap();
    let qids: Vec<u64> = text
        .lines()
        .map(|l| l.split('\t').next().unwrap().parse().unwrap())
        .collect();
    assert_eq!(qids, vec![4]);

    let leftover: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
    assert!(leftover.is_empty(), "temp dir not cleaned: {leftover:?}");
}

#[test]
fn multi_threaded_output_matches_single_threaded_output() {
    // Scenario 2: same input run with N=1 and N=4 must be byte-identical.
    let mut lines = String::new();
    for i in 0..100 {
        lines.push_str(&format!("ACGT{i}\n"));
    }
    let input = write_reads(&lines);

    let run = |threads: &str| -> String {
        let out = tempfile::NamedTempFile::new().unwrap();
        let temp_dir = tempfile::tempdir().unwrap();
        Command::cargo_bin("shortmap")
            .unwrap()
            .arg("--input")
            .arg(input.path())
            .arg("--index")
            .arg("/nonexistent-index-base")
            .arg("--output")
            .arg(out.path())
            .arg("--temp-dir")
            .arg(temp_dir.path())
            .arg("--unpaired")
            .arg("--batch-size")
            .arg("7")
            .arg("--threads")
            .arg(threads)
            .assert()
            .success();
        fs::read_to_string(out.path()).unwrap()
    };

    let single = run("1");
    let multi = run("4");
    assert_eq!(single, multi);
}

#[test]
fn force_paired_rejects_unpaired_input() {
    let input = write_reads("AAAA\nCCCC\n");
    let out = tempfile::NamedTempFile::new().unwrap();
    let temp_dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("shortmap")
        .unwrap()
        .arg("--input")
        .arg(input.path())
        .arg("--index")
        .arg("/nonexistent-index-base")
        .arg("--output")
        .arg(out.path())
        .arg("--temp-dir")
        .arg(temp_dir.path())
        .arg("--paired")
        .assert()
        .failure()
        .stderr(predicates::str::contains(
            "paired search is requested but input is not paired",
        ));
}

#[test]
fn both_pairing_flags_fails_validation() {
    let input = write_reads("AAAA\nCCCC\n");
    let out = tempfile::NamedTempFile::new().unwrap();
    let temp_dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("shortmap")
        .unwrap()
        .arg("--input")
        .arg(input.path())
        .arg("--index")
        .arg("/nonexistent-index-base")
        .arg("--output")
        .arg(out.path())
        .arg("--temp-dir")
        .arg(temp_dir.path())
        .arg("--paired")
        .arg("--unpaired")
        .assert()
        .failure()
        .stderr(predicates::str::contains("cannot request both"));
}

#[test]
fn paired_batches_double_the_effective_limit() {
    let mut lines = String::new();
    for i in 0..20 {
        lines.push_str(&format!("ACGT{i}\tTGCA{i}\n"));
    }
    let input = write_reads(&lines);
    let out = tempfile::NamedTempFile::new().unwrap();
    let temp_dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("shortmap")
        .unwrap()
        .arg("--input")
        .arg(input.path())
        .arg("--index")
        .arg("/nonexistent-index-base")
        .arg("--output")
        .arg(out.path())
        .arg("--temp-dir")
        .arg(temp_dir.path())
        .arg("--paired")
        .arg("--batch-size")
        .arg("10")
        .assert()
        .success();

    let text = fs::read_to_string(out.path()).unwrap();
    assert_eq!(text.lines().count(), 20);
}
