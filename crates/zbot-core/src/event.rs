//! Webhook payload normalization.
//!
//! Each supported webhook becomes one [`Event`] variant carrying only the
//! fields rules can use. Anything else, including payloads whose shape does not
//! match, becomes [`Event::Unknown`]: rules simply never match it.

use serde::Deserialize;
use serde_json::Value;

use crate::capability::IssueSubject;
use crate::platform::RepoRef;

/// Type tag of the synthetic schedule trigger.
pub const SCHEDULE_EVENT: &str = "schedule";

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueComment {
    pub repo: RepoRef,
    pub issue: u64,
    pub action: String,
    pub comment: String,
    pub author: String,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueActivity {
    pub repo: RepoRef,
    pub issue: u64,
    pub action: String,
    pub title: String,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardMove {
    /// Absent for cards on organization-level projects.
    pub repo: Option<RepoRef>,
    pub new_column: String,
    pub content_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    IssueComment(IssueComment),
    Issues(IssueActivity),
    ProjectCardMoved(CardMove),
    Unknown,
}

impl Event {
    /// Normalize a parsed webhook body. `type_hint` is the platform's event
    /// name header. Never fails.
    pub fn normalize(type_hint: &str, payload: &Value) -> Event {
        match type_hint {
            "issue_comment" => decode::<wire::IssueCommentPayload>(payload)
                .map(|p| {
                    Event::IssueComment(IssueComment {
                        repo: p.repository.into(),
                        issue: p.issue.number,
                        action: p.action,
                        comment: p.comment.body.unwrap_or_default(),
                        author: p.comment.user.map(|u| u.login).unwrap_or_default(),
                        labels: p.issue.labels.into_iter().map(|l| l.name).collect(),
                    })
                })
                .unwrap_or(Event::Unknown),
            "issues" => decode::<wire::IssuesPayload>(payload)
                .map(|p| {
                    Event::Issues(IssueActivity {
                        repo: p.repository.into(),
                        issue: p.issue.number,
                        action: p.action,
                        title: p.issue.title,
                        labels: p.issue.labels.into_iter().map(|l| l.name).collect(),
                    })
                })
                .unwrap_or(Event::Unknown),
            "project_card" => decode::<wire::ProjectCardPayload>(payload)
                .filter(|p| p.action == "moved")
                .map(|p| {
                    let new_column = match (p.project_card.column_name, p.project_card.column_id) {
                        (Some(name), _) => name,
                        (None, Some(id)) => id.to_string(),
                        (None, None) => String::new(),
                    };
                    Event::ProjectCardMoved(CardMove {
                        repo: p.repository.map(Into::into),
                        new_column,
                        content_url: p.project_card.content_url,
                    })
                })
                .unwrap_or(Event::Unknown),
            _ => Event::Unknown,
        }
    }

    /// Tag rules are matched against.
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::IssueComment(_) => "issue_comment",
            Event::Issues(_) => "issues",
            Event::ProjectCardMoved(_) => "project_card:moved",
            Event::Unknown => "unknown",
        }
    }

    /// Repository whose installation credentials apply. `None` means the event
    /// must be dropped.
    pub fn target_repo(&self) -> Option<&RepoRef> {
        match self {
            Event::IssueComment(e) => Some(&e.repo),
            Event::Issues(e) => Some(&e.repo),
            Event::ProjectCardMoved(e) => e.repo.as_ref(),
            Event::Unknown => None,
        }
    }

    /// The issue the event is directly about, for events that carry one.
    pub fn issue_subject(&self) -> Option<IssueSubject> {
        match self {
            Event::IssueComment(e) => Some(IssueSubject {
                repo: e.repo.clone(),
                issue: e.issue,
            }),
            Event::Issues(e) => Some(IssueSubject {
                repo: e.repo.clone(),
                issue: e.issue,
            }),
            Event::ProjectCardMoved(_) | Event::Unknown => None,
        }
    }
}

fn decode<T: for<'de> Deserialize<'de>>(payload: &Value) -> Option<T> {
    T::deserialize(payload).ok()
}

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

/// What a rule engine run is reacting to.
#[derive(Debug, Clone, Copy)]
pub enum Trigger<'a> {
    Event(&'a Event),
    Schedule,
}

impl Trigger<'_> {
    pub fn event_type(&self) -> &'static str {
        match self {
            Trigger::Event(event) => event.event_type(),
            Trigger::Schedule => SCHEDULE_EVENT,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

mod wire {
    use serde::Deserialize;

    use crate::platform::RepoRef;

    #[derive(Deserialize)]
    pub struct Account {
        pub login: String,
    }

    #[derive(Deserialize)]
    pub struct Repository {
        pub name: String,
        pub owner: Account,
    }

    impl From<Repository> for RepoRef {
        fn from(r: Repository) -> Self {
            RepoRef::new(r.owner.login, r.name)
        }
    }

    #[derive(Deserialize)]
    pub struct Label {
        pub name: String,
    }

    #[derive(Deserialize)]
    pub struct Issue {
        pub number: u64,
        #[serde(default)]
        pub title: String,
        #[serde(default)]
        pub labels: Vec<Label>,
    }

    #[derive(Deserialize)]
    pub struct Comment {
        #[serde(default)]
        pub body: Option<String>,
        #[serde(default)]
        pub user: Option<Account>,
    }

    #[derive(Deserialize)]
    pub struct IssueCommentPayload {
        pub action: String,
        pub issue: Issue,
        pub comment: Comment,
        pub repository: Repository,
    }

    #[derive(Deserialize)]
    pub struct IssuesPayload {
        pub action: String,
        pub issue: Issue,
        pub repository: Repository,
    }

    #[derive(Deserialize)]
    pub struct ProjectCard {
        #[serde(default)]
        pub column_name: Option<String>,
        #[serde(default)]
        pub column_id: Option<u64>,
        #[serde(default)]
        pub content_url: Option<String>,
    }

    #[derive(Deserialize)]
    pub struct ProjectCardPayload {
        pub action: String,
        pub project_card: ProjectCard,
        #[serde(default)]
        pub repository: Option<Repository>,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn repository() -> Value {
        json!({ "name": "hello", "owner": { "login": "octo" } })
    }

    #[test]
    fn normalizes_issue_comment() {
        let payload = json!({
            "action": "created",
            "issue": { "number": 7, "title": "Crash", "labels": [{ "name": "bug" }, { "name": "p1" }] },
            "comment": { "body": "/close", "user": { "login": "alice" } },
            "repository": repository(),
        });

        let event = Event::normalize("issue_comment", &payload);

        let Event::IssueComment(e) = &event else {
            panic!("expected IssueComment, got {event:?}")
        };
        assert_eq!(e.comment, "/close");
        assert_eq!(e.author, "alice");
        assert_eq!(e.labels, vec!["bug", "p1"]);
        assert_eq!(e.issue, 7);
        assert_eq!(event.event_type(), "issue_comment");
        assert_eq!(event.target_repo(), Some(&RepoRef::new("octo", "hello")));
        assert_eq!(event.issue_subject().map(|s| s.issue), Some(7));
    }

    #[test]
    fn normalizes_issues_event() {
        let payload = json!({
            "action": "opened",
            "issue": { "number": 3, "title": "Add docs" },
            "repository": repository(),
        });

        let event = Event::normalize("issues", &payload);

        let Event::Issues(e) = &event else {
            panic!("expected Issues, got {event:?}")
        };
        assert_eq!(e.action, "opened");
        assert_eq!(e.title, "Add docs");
        assert!(e.labels.is_empty());
    }

    #[test]
    fn normalizes_moved_project_card() {
        let payload = json!({
            "action": "moved",
            "project_card": {
                "column_name": "Done",
                "column_id": 99,
                "content_url": "https://api.github.com/repos/octo/hello/issues/5"
            },
            "repository": repository(),
        });

        let event = Event::normalize("project_card", &payload);

        assert_eq!(event.event_type(), "project_card:moved");
        let Event::ProjectCardMoved(card) = &event else {
            panic!("expected ProjectCardMoved")
        };
        assert_eq!(card.new_column, "Done");
        assert!(event.issue_subject().is_none());
    }

    #[test]
    fn card_without_column_name_falls_back_to_id() {
        let payload = json!({
            "action": "moved",
            "project_card": { "column_id": 99 },
        });

        let event = Event::normalize("project_card", &payload);

        let Event::ProjectCardMoved(card) = &event else {
            panic!("expected ProjectCardMoved")
        };
        assert_eq!(card.new_column, "99");
        assert_eq!(event.target_repo(), None);
    }

    #[test]
    fn other_card_actions_are_unknown() {
        let payload = json!({ "action": "created", "project_card": {}, "repository": repository() });
        assert_eq!(Event::normalize("project_card", &payload), Event::Unknown);
    }

    #[test]
    fn unsupported_event_names_are_unknown() {
        let payload = json!({ "ref": "refs/heads/main", "repository": repository() });
        let event = Event::normalize("push", &payload);
        assert_eq!(event, Event::Unknown);
        assert_eq!(event.event_type(), "unknown");
        assert_eq!(event.target_repo(), None);
    }

    #[test]
    fn mismatched_shapes_are_unknown() {
        assert_eq!(Event::normalize("issue_comment", &json!([1, 2, 3])), Event::Unknown);
        assert_eq!(Event::normalize("issue_comment", &json!({ "action": "created" })), Event::Unknown);
        assert_eq!(Event::normalize("issues", &Value::Null), Event::Unknown);
    }

    #[test]
    fn null_comment_body_is_empty() {
        let payload = json!({
            "action": "created",
            "issue": { "number": 1 },
            "comment": { "body": null },
            "repository": repository(),
        });
        let Event::IssueComment(e) = Event::normalize("issue_comment", &payload) else {
            panic!("expected IssueComment")
        };
        assert_eq!(e.comment, "");
        assert_eq!(e.author, "");
    }

    #[test]
    fn schedule_trigger_has_schedule_tag() {
        assert_eq!(Trigger::Schedule.event_type(), "schedule");
        assert_eq!(Trigger::Event(&Event::Unknown).event_type(), "unknown");
    }
}
