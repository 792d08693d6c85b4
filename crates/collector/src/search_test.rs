//! Tests for log file search

use super::*;

use std::fs::{self, File};

use strand_protocol::{Command, Uuid, encode_message};
use strand_sinks::{file_name, write_frame};

fn write_file(dir: &Path, index: usize, messages: &[LogMessage]) {
    let mut file = File::create(dir.join(file_name(index))).unwrap();
    for msg in messages {
        write_frame(&mut file, &encode_message(msg).unwrap()).unwrap();
    }
}

fn tags(messages: &[LogMessage]) -> Vec<i64> {
    messages.iter().map(|m| m.client_tag).collect()
}

#[test]
fn test_matches_across_files_in_index_order() {
    let dir = tempfile::tempdir().unwrap();
    let app = Uuid::new_v4();
    let event = |tag, level| LogMessage::new(app).with_client_tag(tag).with_level(level);

    write_file(dir.path(), 1, &[event(10, 0), event(11, 4)]);
    write_file(dir.path(), 0, &[event(0, 1), event(1, 5)]);

    let found = search_log_files(dir.path(), &FilterSpec::on().with_max_level(2)).unwrap();
    assert_eq!(tags(&found), vec![0, 10]);
}

#[test]
fn test_state_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let msg = LogMessage::new(Uuid::new_v4()).with_command(Command::Start);
    write_file(dir.path(), 0, &[msg]);

    let spec = FilterSpec::new(strand_protocol::FilterState::Search).with_command(Command::Start);
    assert_eq!(search_log_files(dir.path(), &spec).unwrap().len(), 1);
}

#[test]
fn test_corrupt_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(file_name(0)), [9, 0, 0, 0, 1]).unwrap();

    let err = search_log_files(dir.path(), &FilterSpec::on()).unwrap_err();
    assert!(err.is_corrupt());
}

#[test]
fn test_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    assert!(search_log_files(dir.path(), &FilterSpec::on()).unwrap().is_empty());
}
