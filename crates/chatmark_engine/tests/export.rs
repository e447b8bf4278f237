use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chatmark_core::RecoverySettings;
use chatmark_engine::{
    ExportError, ExportSettings, Exporter, NullProgressSink, PageDriver, PageError,
    PlatformProfile, ReplayPage, ScrollRegion,
};
use pretty_assertions::assert_eq;

fn fast_exporter(output_dir: std::path::PathBuf) -> Exporter {
    Exporter::new(ExportSettings {
        output_dir,
        recovery: RecoverySettings {
            round_delay: Duration::ZERO,
            ..RecoverySettings::default()
        },
    })
}

const CHATGPT_SNAPSHOT: &str = r#"<html><head><title>Greetings - ChatGPT</title></head><body>
<main>
<div data-message-id="m1" data-message-author-role="user"><p>Hello</p></div>
<div data-message-id="m2" data-message-author-role="assistant"><ol><li>a</li><li>b</li></ol></div>
<div data-message-id="m3" data-message-author-role="assistant"><button>Retry</button></div>
</main></body></html>"#;

#[tokio::test]
async fn chatgpt_snapshot_exports_the_expected_document() {
    let temp = tempfile::TempDir::new().unwrap();
    let exporter = fast_exporter(temp.path().to_path_buf());
    let page = ReplayPage::new("chatgpt.com", CHATGPT_SNAPSHOT);

    let summary = exporter
        .export(&page, None, &NullProgressSink)
        .await
        .unwrap();

    // The button-only message converts to nothing and is skipped.
    assert_eq!(summary.message_count, 2);
    assert_eq!(summary.recovery_rounds, 0);
    assert_eq!(summary.artifact, temp.path().join("Greetings.md"));

    let document = std::fs::read_to_string(&summary.artifact).unwrap();
    assert_eq!(
        document,
        "# Conversation: Greetings\n\n---\n\n\
         ## User\n\nHello\n\n---\n\n\
         ## Assistant\n\n1. a\n2. b\n\n---\n\n"
    );
}

#[tokio::test]
async fn gemini_snapshot_uses_sidebar_title_and_tag_roles() {
    let html = r#"<html><head><title>ignored - Gemini</title></head><body>
<conversations-list><div class="selected">
  <div class="conversation-title">Trip / plan</div>
</div></conversations-list>
<main><infinite-scroller class="chat-history">
<user-query><p>What is the plan?</p></user-query>
<model-response><p>See <strong>below</strong></p><ul><li>pack</li></ul></model-response>
</infinite-scroller></main></body></html>"#;

    let temp = tempfile::TempDir::new().unwrap();
    let exporter = fast_exporter(temp.path().to_path_buf());
    let page = ReplayPage::new("gemini.google.com", html);

    let summary = exporter
        .export(&page, None, &NullProgressSink)
        .await
        .unwrap();

    assert_eq!(summary.artifact, temp.path().join("Trip _ plan.md"));
    let document = std::fs::read_to_string(&summary.artifact).unwrap();
    assert_eq!(
        document,
        "# Conversation: Trip _ plan\n\n---\n\n\
         ## User\n\nWhat is the plan?\n\n---\n\n\
         ## Assistant\n\nSee **below**\n\n- pack\n\n---\n\n"
    );
}

#[tokio::test]
async fn missing_title_falls_back_to_the_fixed_name() {
    let html = r#"<html><body><main>
<div data-message-id="m1" data-message-author-role="user"><p>hi there</p></div>
</main></body></html>"#;

    let temp = tempfile::TempDir::new().unwrap();
    let exporter = fast_exporter(temp.path().to_path_buf());
    let page = ReplayPage::new("chatgpt.com", html);

    let summary = exporter
        .export(&page, None, &NullProgressSink)
        .await
        .unwrap();

    assert_eq!(summary.artifact, temp.path().join("Chat_Export.md"));
    let document = std::fs::read_to_string(&summary.artifact).unwrap();
    assert!(document.starts_with("# Conversation: Chat_Export\n"));
}

#[tokio::test]
async fn unsupported_host_fails_without_touching_the_output_dir() {
    let temp = tempfile::TempDir::new().unwrap();
    let out = temp.path().join("out");
    let exporter = fast_exporter(out.clone());
    let page = ReplayPage::new("example.com", "<html><body></body></html>");

    let err = exporter
        .export(&page, None, &NullProgressSink)
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::UnsupportedPlatform { .. }));
    assert!(!out.exists(), "failed export must not create artifacts");
}

#[tokio::test]
async fn custom_profile_overrides_host_detection() {
    let profile = PlatformProfile::from_json(
        r#"{
            "title_selectors": ["header h1"],
            "title_affixes": [],
            "scroller_selectors": [],
            "message_selector": ".turn",
            "role_rule": { "kind": "tag_or_class", "tags": [], "classes": ["mine"] }
        }"#,
    )
    .unwrap();

    let html = r#"<html><body><header><h1>Custom board</h1></header>
<div class="turn mine"><p>question</p></div>
<div class="turn"><p>answer</p></div>
</body></html>"#;

    let temp = tempfile::TempDir::new().unwrap();
    let exporter = fast_exporter(temp.path().to_path_buf());
    let page = ReplayPage::new("example.com", html);

    let summary = exporter
        .export(&page, Some(profile), &NullProgressSink)
        .await
        .unwrap();

    let document = std::fs::read_to_string(&summary.artifact).unwrap();
    assert!(document.starts_with("# Conversation: Custom board\n"));
    assert!(document.contains("## User\n\nquestion"));
    assert!(document.contains("## Assistant\n\nanswer"));
}

#[tokio::test]
async fn re_export_replaces_the_previous_artifact() {
    let temp = tempfile::TempDir::new().unwrap();
    let exporter = fast_exporter(temp.path().to_path_buf());
    let page = ReplayPage::new("chatgpt.com", CHATGPT_SNAPSHOT);

    let first = exporter
        .export(&page, None, &NullProgressSink)
        .await
        .unwrap();
    let second = exporter
        .export(&page, None, &NullProgressSink)
        .await
        .unwrap();

    assert_eq!(first.artifact, second.artifact);
    let entries = std::fs::read_dir(temp.path()).unwrap().count();
    assert_eq!(entries, 1);
}

struct StalledRegion;

#[async_trait]
impl ScrollRegion for StalledRegion {
    async fn extent(&self) -> u64 {
        1000
    }
    async fn reset_to_origin(&self) {}
    async fn nudge(&self) {}
}

struct SlowPage {
    region: StalledRegion,
}

#[async_trait]
impl PageDriver for SlowPage {
    fn host(&self) -> &str {
        "chatgpt.com"
    }

    fn scroll_region(&self) -> Option<&dyn ScrollRegion> {
        Some(&self.region)
    }

    async fn snapshot(&self) -> Result<String, PageError> {
        Ok(CHATGPT_SNAPSHOT.to_string())
    }
}

#[tokio::test]
async fn second_trigger_while_in_flight_is_rejected() {
    let temp = tempfile::TempDir::new().unwrap();
    let exporter = Arc::new(Exporter::new(ExportSettings {
        output_dir: temp.path().to_path_buf(),
        recovery: RecoverySettings {
            round_delay: Duration::from_millis(5),
            ..RecoverySettings::default()
        },
    }));
    let page = SlowPage {
        region: StalledRegion,
    };

    let (first, second) = tokio::join!(
        exporter.export(&page, None, &NullProgressSink),
        exporter.export(&page, None, &NullProgressSink),
    );

    // The first future acquires the in-flight flag on its first poll; the
    // second is rejected while the first sleeps between rounds.
    assert!(first.is_ok());
    assert!(matches!(second, Err(ExportError::AlreadyRunning)));
}
