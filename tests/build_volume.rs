use std::fs;
use std::path::Path;
use std::process::Command;

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_volpress")
}

fn volume_bib(entries: &[&str]) -> String {
    let mut text = String::from(
        "@proceedings{v99-2024,\n  booktitle = {Conference on Worked Examples},\n  name = {Conference on Worked Examples},\n  shortname = {CWE},\n  year = {2024},\n  volume = {99},\n  published = {2024-07-01},\n}\n",
    );
    for entry in entries {
        text.push_str(entry);
    }
    text
}

fn paper(key: &str, family: &str, pages: &str) -> String {
    format!(
        "@inproceedings{{{key},\n  title = {{A Study by {family}}},\n  author = {{{family}, Jane}},\n  pages = {{{pages}}},\n  year = {{2024}},\n}}\n"
    )
}

fn seed_asset(root: &Path, stub: &str) {
    let dir = root.join("assets").join(stub);
    fs::create_dir_all(&dir).expect("create asset dir");
    fs::write(dir.join(format!("{stub}.pdf")), b"%PDF-1.4").expect("write pdf");
}

#[test]
fn missing_author_entry_is_skipped_and_the_batch_continues() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let input = temp_dir.path().join("volume.bib");
    let out_dir = temp_dir.path().join("_records");
    let no_author =
        "@inproceedings{ghost24,\n  title = {An Unattributed Study},\n  pages = {11-20},\n}\n";
    fs::write(
        &input,
        volume_bib(&[
            &paper("smith24", "Smith", "1-10"),
            no_author,
            &paper("doe24", "Doe", "21-30"),
        ]),
    )
    .expect("write input");
    seed_asset(temp_dir.path(), "smith24a");
    seed_asset(temp_dir.path(), "doe24a");

    let run = Command::new(bin())
        .arg("build")
        .arg(&input)
        .arg("--volume")
        .arg("99")
        .arg("--out-dir")
        .arg(&out_dir)
        .arg("--assets-dir")
        .arg(temp_dir.path())
        .output()
        .expect("run build");
    assert!(run.status.success(), "stderr: {}", String::from_utf8_lossy(&run.stderr));

    let stdout = String::from_utf8_lossy(&run.stdout);
    assert!(stdout.contains("Processed 2 entries, skipped 1 due to errors."));

    let records: Vec<String> = fs::read_dir(&out_dir)
        .expect("read records dir")
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    assert_eq!(records.len(), 2);
    assert!(records.contains(&"2024-07-01-smith24a.json".to_string()));
    assert!(records.contains(&"2024-07-01-doe24a.json".to_string()));
}

#[test]
fn missing_primary_asset_aborts_the_whole_run() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let input = temp_dir.path().join("volume.bib");
    let out_dir = temp_dir.path().join("_records");
    fs::write(
        &input,
        volume_bib(&[
            &paper("smith24", "Smith", "1-10"),
            &paper("doe24", "Doe", "21-30"),
        ]),
    )
    .expect("write input");
    // Only the first paper's asset exists.
    seed_asset(temp_dir.path(), "smith24a");

    let run = Command::new(bin())
        .arg("build")
        .arg(&input)
        .arg("--volume")
        .arg("99")
        .arg("--out-dir")
        .arg(&out_dir)
        .arg("--assets-dir")
        .arg(temp_dir.path())
        .output()
        .expect("run build");
    assert!(!run.status.success());
    let stderr = String::from_utf8_lossy(&run.stderr);
    assert!(stderr.contains("is not present"));

    // No record for the failing entry or anything after it.
    let records: Vec<String> = fs::read_dir(&out_dir)
        .expect("read records dir")
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    assert!(!records.contains(&"2024-07-01-doe24a.json".to_string()));
}

#[test]
fn emitted_records_carry_decoded_fields_and_links() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let input = temp_dir.path().join("volume.bib");
    let out_dir = temp_dir.path().join("_records");
    let software = temp_dir.path().join("software.csv");
    fs::write(&software, "mueller24,https://github.com/example/code\n").expect("write table");
    let paper_entry = "@inproceedings{mueller24,\n  title = {Learning with H\\'ector},\n  author = {M\\\"{u}ller, Hans},\n  pages = {5-15},\n  abstract = {We report a 25\\% gain.},\n}\n";
    fs::write(&input, volume_bib(&[paper_entry])).expect("write input");
    seed_asset(temp_dir.path(), "muller24a");

    let run = Command::new(bin())
        .arg("build")
        .arg(&input)
        .arg("--volume")
        .arg("99")
        .arg("--out-dir")
        .arg(&out_dir)
        .arg("--assets-dir")
        .arg(temp_dir.path())
        .arg("--software-file")
        .arg(&software)
        .output()
        .expect("run build");
    assert!(run.status.success(), "stderr: {}", String::from_utf8_lossy(&run.stderr));

    let record_path = out_dir.join("2024-07-01-muller24a.json");
    let record: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&record_path).expect("read record"))
            .expect("parse record");

    assert_eq!(record["id"], "muller24a");
    assert_eq!(record["title"], "Learning with H\u{e9}ctor");
    assert_eq!(record["author"][0]["family"], "M\u{fc}ller");
    assert_eq!(record["firstpage"], 5);
    assert_eq!(record["lastpage"], 15);
    assert_eq!(record["software"], "https://github.com/example/code");
    assert_eq!(
        record["pdf"],
        "https://raw.githubusercontent.com/mlresearch/v99/main/assets/muller24a/muller24a.pdf"
    );
    assert_eq!(record["issued"]["date-parts"][0], 2024);
}

#[test]
fn duplicate_first_authors_get_distinct_stub_suffixes() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let input = temp_dir.path().join("volume.bib");
    let out_dir = temp_dir.path().join("_records");
    fs::write(
        &input,
        volume_bib(&[
            &paper("smithA", "Smith", "1-10"),
            &paper("smithB", "Smith", "11-20"),
        ]),
    )
    .expect("write input");
    seed_asset(temp_dir.path(), "smith24a");
    seed_asset(temp_dir.path(), "smith24b");

    let run = Command::new(bin())
        .arg("build")
        .arg(&input)
        .arg("--volume")
        .arg("99")
        .arg("--out-dir")
        .arg(&out_dir)
        .arg("--assets-dir")
        .arg(temp_dir.path())
        .output()
        .expect("run build");
    assert!(run.status.success(), "stderr: {}", String::from_utf8_lossy(&run.stderr));

    assert!(out_dir.join("2024-07-01-smith24a.json").exists());
    assert!(out_dir.join("2024-07-01-smith24b.json").exists());
}

#[test]
fn raw_unicode_in_an_abstract_aborts_the_build() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let input = temp_dir.path().join("volume.bib");
    let out_dir = temp_dir.path().join("_records");
    let store = temp_dir.path().join("store.json");
    // A store entry that maps to another non-ASCII character gets past the
    // tidy pass; the strict abstract check must still reject the result.
    fs::write(
        &store,
        "{\"\u{e9}\": {\"replacement\": \"\u{f6}\", \"name\": \"LATIN SMALL LETTER E WITH ACUTE\"}}",
    )
    .expect("write store");
    let paper_entry = "@inproceedings{smith24,\n  title = {T},\n  author = {Smith, Jane},\n  pages = {1-2},\n  abstract = {caf\u{e9}},\n}\n";
    fs::write(&input, volume_bib(&[paper_entry])).expect("write input");
    seed_asset(temp_dir.path(), "smith24a");

    let run = Command::new(bin())
        .arg("build")
        .arg(&input)
        .arg("--volume")
        .arg("99")
        .arg("--out-dir")
        .arg(&out_dir)
        .arg("--assets-dir")
        .arg(temp_dir.path())
        .arg("--store")
        .arg(&store)
        .output()
        .expect("run build");
    assert!(!run.status.success());
    let stderr = String::from_utf8_lossy(&run.stderr);
    assert!(stderr.contains("contains raw Unicode characters"));
}
