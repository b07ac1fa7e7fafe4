use coverage_sync_core::aggregate::{aggregate_commits, FileEntry};
use coverage_sync_core::contract::CoverageRow;

fn row(commit_id: i64, language: Option<&str>, filename: &str) -> CoverageRow {
    CoverageRow {
        commit_id,
        file_id: commit_id * 100,
        coverage: Some(r#"{"1":1}"#.to_string()),
        commit_uuid: Some(format!("uuid-{commit_id}")),
        project_id: Some(9),
        language: language.map(str::to_string),
        filename: Some(filename.to_string()),
        total: Some(50.0),
    }
}

#[test]
fn every_row_lands_in_exactly_one_file_entry() {
    let rows = vec![
        row(1, Some("python"), "a.py"),
        row(2, Some("java"), "A.java"),
        row(1, Some("python"), "b.py"),
        row(1, Some("java"), "B.java"),
        row(3, None, "c"),
        row(2, Some("java"), "C.java"),
    ];
    let expected: Vec<(i64, Option<String>, Option<String>)> = rows
        .iter()
        .map(|r| (r.commit_id, r.language.clone(), r.filename.clone()))
        .collect();

    let commits = aggregate_commits(rows);

    let mut seen = Vec::new();
    for (commit_id, aggregate) in &commits {
        for (language, entries) in &aggregate.languages {
            for entry in entries {
                seen.push((*commit_id, language.clone(), entry.filename.clone()));
            }
        }
    }
    assert_eq!(seen.len(), expected.len(), "no row may be dropped or duplicated");
    for item in &expected {
        assert_eq!(
            seen.iter().filter(|s| *s == item).count(),
            1,
            "row {item:?} should appear exactly once"
        );
    }
}

#[test]
fn rows_with_different_commit_ids_never_merge() {
    let mut first = row(10, Some("python"), "same.py");
    let mut second = row(11, Some("python"), "same.py");
    first.commit_uuid = Some("shared".into());
    second.commit_uuid = Some("shared".into());

    let commits = aggregate_commits(vec![first, second]);

    assert_eq!(commits.len(), 2);
    assert_eq!(commits[&10].file_count(), 1);
    assert_eq!(commits[&11].file_count(), 1);
}

#[test]
fn null_and_empty_languages_form_their_own_buckets() {
    let commits = aggregate_commits(vec![
        row(4, None, "null.txt"),
        row(4, Some(""), "empty.txt"),
        row(4, Some("python"), "a.py"),
        row(4, None, "null2.txt"),
    ]);

    let languages = &commits[&4].languages;
    assert_eq!(languages.len(), 3);
    assert_eq!(languages[&None].len(), 2);
    assert_eq!(languages[&Some(String::new())].len(), 1);
    assert_eq!(languages[&Some("python".to_string())].len(), 1);
}

#[test]
fn first_row_of_a_commit_supplies_project_and_uuid() {
    let first = row(7, Some("python"), "a.py");
    let mut later = row(7, Some("java"), "A.java");
    later.project_id = Some(42);
    later.commit_uuid = Some("other".into());

    let commits = aggregate_commits(vec![first, later]);

    let aggregate = &commits[&7];
    assert_eq!(aggregate.project_id, Some(9));
    assert_eq!(aggregate.commit_uuid.as_deref(), Some("uuid-7"));
    assert_eq!(aggregate.languages.len(), 2);
}

#[test]
fn file_entries_keep_input_order_and_raw_blob() {
    let mut broken = row(5, Some("python"), "z.py");
    broken.coverage = Some("not json".into());
    let commits = aggregate_commits(vec![broken, row(5, Some("python"), "a.py")]);

    let entries = &commits[&5].languages[&Some("python".to_string())];
    assert_eq!(
        entries[0],
        FileEntry {
            filename: Some("z.py".into()),
            total: Some(50.0),
            coverage: Some("not json".into()),
        }
    );
    assert_eq!(entries[1].filename.as_deref(), Some("a.py"));
}

#[test]
fn commits_iterate_in_ascending_id_order() {
    let commits = aggregate_commits(vec![
        row(30, Some("go"), "x.go"),
        row(10, Some("go"), "y.go"),
        row(20, Some("go"), "z.go"),
    ]);
    let ids: Vec<i64> = commits.keys().copied().collect();
    assert_eq!(ids, vec![10, 20, 30]);
}

#[test]
fn empty_input_yields_no_commits() {
    assert!(aggregate_commits(Vec::new()).is_empty());
}
