//! Integration tests for the full featurization pipeline

use convo_featurizer::table::read_table;
use convo_featurizer::{Config, FeatureBuilder, FeaturizeError, RawTable, Stage};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};

const TRANSCRIPT: &str = "conversation_num,speaker_nickname,message,outcome\n\
                          A,ann,Hello there team,0.8\n\
                          A,bob,What? I missed that,0.8\n\
                          B,cat,ok,0.2\n\
                          A,ann,I think we should plan the next step carefully,0.8\n";

struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir()
            .join(format!("convo-featurizer-{name}-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).expect("Failed to create test dir");
        Self { dir }
    }

    fn input(&self, contents: &[u8]) -> PathBuf {
        let path = self.dir.join("chats.csv");
        fs::write(&path, contents).expect("Failed to write input");
        path
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn run(&self, input: &Path, tag: &str) -> Result<(RawTable, RawTable), FeaturizeError> {
        let chat = self.path(&format!("{tag}_chat_level.csv"));
        let conversation = self.path(&format!("{tag}_conversation_level.csv"));
        FeatureBuilder::new(input, &chat, &conversation, Config::default()).featurize()?;
        Ok((read_table(&chat)?, read_table(&conversation)?))
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

fn cell<'a>(table: &'a RawTable, column: &str, row: usize) -> &'a str {
    table
        .column(column)
        .unwrap_or_else(|| panic!("missing column {column}"))[row]
}

#[test]
fn test_two_conversation_transcript() {
    let ws = Workspace::new("e2e");
    let input = ws.input(TRANSCRIPT.as_bytes());

    let (chat, conversation) = ws.run(&input, "out").expect("pipeline failed");

    assert_eq!(chat.len(), 4);
    assert_eq!(conversation.len(), 2);
    assert_eq!(
        &chat.headers[..5],
        &["conversation_num", "speaker_nickname", "message", "outcome", "message_lower_with_punc"]
    );
    assert_eq!(cell(&chat, "message", 1), "what i missed that");
    assert_eq!(cell(&chat, "message_lower_with_punc", 1), "what? i missed that");
    assert_eq!(cell(&chat, "num_words", 3), "9");

    assert_eq!(conversation.column("conversation_num").unwrap(), vec!["A", "B"]);
    assert_eq!(cell(&conversation, "num_messages", 0), "3");
    assert_eq!(cell(&conversation, "num_speakers", 0), "2");
    assert_eq!(cell(&conversation, "sum_num_words", 0), "16");

    for column in [
        "gini_coefficient_sum_num_words",
        "gini_coefficient_sum_num_chars",
        "gini_coefficient_sum_num_messages",
        "info_exchange_zscore_trend",
        "max_info_exchange_zscore_conversation",
    ] {
        assert_eq!(cell(&conversation, column, 1), "0", "{column}");
    }
    assert_ne!(cell(&conversation, "gini_coefficient_sum_num_words", 0), "0");
}

#[test]
fn test_dependent_variable_merged_back() {
    let ws = Workspace::new("merge");
    let input = ws.input(TRANSCRIPT.as_bytes());

    let (_, conversation) = ws.run(&input, "out").expect("pipeline failed");

    assert_eq!(conversation.column("outcome").unwrap(), vec!["0.8", "0.2"]);
    assert_eq!(conversation.headers.last().map(String::as_str), Some("outcome"));
    assert!(!conversation.has_column("message"));
    assert!(!conversation.has_column("speaker_nickname"));
}

#[test]
fn test_reruns_are_byte_identical() {
    let ws = Workspace::new("rerun");
    let input = ws.input(TRANSCRIPT.as_bytes());

    ws.run(&input, "first").expect("first run failed");
    ws.run(&input, "second").expect("second run failed");

    for suffix in ["chat_level.csv", "conversation_level.csv"] {
        let first = fs::read(ws.path(&format!("first_{suffix}"))).unwrap();
        let second = fs::read(ws.path(&format!("second_{suffix}"))).unwrap();
        assert!(first == second, "{suffix} differs between runs");
    }
}

#[test]
fn test_missing_columns_leave_no_output() {
    let ws = Workspace::new("missing");
    let input = ws.input(b"speaker_nickname,message\nann,hello\n");

    let err = ws.run(&input, "out").unwrap_err();

    match err {
        FeaturizeError::MissingColumns(missing) => assert_eq!(missing, vec!["conversation_num"]),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!ws.path("out_chat_level.csv").exists());
    assert!(!ws.path("out_conversation_level.csv").exists());
}

#[test]
fn test_failed_save_leaves_no_output() {
    let ws = Workspace::new("failed-save");
    let input = ws.input(TRANSCRIPT.as_bytes());
    let chat = ws.path("out_chat_level.csv");
    let conversation = ws.path("out_conversation_level.csv");
    fs::create_dir_all(&conversation).unwrap();

    let mut builder = FeatureBuilder::new(&input, &chat, &conversation, Config::default());
    let err = builder.featurize().unwrap_err();

    assert!(matches!(err, FeaturizeError::Io { .. }));
    assert_eq!(builder.stage(), Stage::Save);
    assert!(!chat.exists());
    assert!(!ws.path("out_chat_level.csv.partial").exists());
}

#[test]
fn test_failed_save_keeps_previous_run() {
    let ws = Workspace::new("failed-rerun");
    let input = ws.input(TRANSCRIPT.as_bytes());
    ws.run(&input, "out").expect("first run failed");
    let chat = ws.path("out_chat_level.csv");
    let conversation = ws.path("out_conversation_level.csv");
    let previous_chat = fs::read(&chat).unwrap();

    fs::remove_file(&conversation).unwrap();
    fs::create_dir_all(&conversation).unwrap();
    let edited = ws.input(b"conversation_num,speaker_nickname,message\nZ,zed,something new\n");

    let result = FeatureBuilder::new(&edited, &chat, &conversation, Config::default()).featurize();

    assert!(result.is_err());
    assert!(fs::read(&chat).unwrap() == previous_chat, "chat output was replaced");
}

#[test]
fn test_mac_roman_input() {
    let ws = Workspace::new("macroman");
    let mut bytes = b"conversation_num,speaker_nickname,message\n1,ann,Caf".to_vec();
    bytes.push(0x8E);
    bytes.extend_from_slice(b" time?\n1,bob,sure\n");
    let input = ws.input(&bytes);

    let (chat, conversation) = ws.run(&input, "out").expect("pipeline failed");

    assert_eq!(cell(&chat, "message_lower_with_punc", 0), "café time?");
    assert_eq!(cell(&chat, "message", 0), "caf time");
    assert_eq!(cell(&chat, "num_question_naive", 0), "1");
    assert_eq!(conversation.len(), 1);
}

#[test]
fn test_outputs_created_in_missing_directory() {
    let ws = Workspace::new("nested");
    let input = ws.input(TRANSCRIPT.as_bytes());
    let chat = ws.path("nested/dir/chat.csv");
    let conversation = ws.path("nested/dir/conversation.csv");

    let mut builder = FeatureBuilder::new(&input, &chat, &conversation, Config::default());
    builder.featurize().expect("pipeline failed");

    assert!(chat.exists());
    assert!(conversation.exists());
    assert!(!ws.path("nested/dir/chat.csv.partial").exists());
    assert_eq!(builder.log().stats().messages_processed, 4);
    assert_eq!(builder.log().stats().conversations_processed, 2);
}
