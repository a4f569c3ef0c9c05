use serde_json::{Map, Value};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    PrimitiveDateTime,
};

use super::dto::{
    ListQuery, NewTodo, Page, TodoFilter, TodoPatch, DEFAULT_PRIORITY, MAX_LIMIT,
};
use crate::error::AppError;

const TITLE_MAX: usize = 255;

const TITLE_REQUIRED: &str = "Title is required and must be a string";
const TITLE_LENGTH: &str = "Title must be between 1 and 255 characters";
const DESCRIPTION_TYPE: &str = "Description must be a string";
const PRIORITY_RANGE: &str = "Priority must be a number between 1 and 3";
const DUE_DATE_FORMAT: &str = "Invalid due date format";
const COMPLETED_TYPE: &str = "Completed must be a boolean value";
const NOTHING_TO_UPDATE: &str = "No valid fields to update";

pub fn parse_todo_id(raw: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::validation("Valid todo ID is required"))
}

fn title(value: &Value) -> Result<String, AppError> {
    let Value::String(s) = value else {
        return Err(AppError::validation(TITLE_LENGTH));
    };
    let trimmed = s.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > TITLE_MAX {
        return Err(AppError::validation(TITLE_LENGTH));
    }
    Ok(trimmed.to_string())
}

fn priority(value: &Value) -> Result<i32, AppError> {
    let n = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match n {
        Some(p @ 1..=3) => Ok(p as i32),
        _ => Err(AppError::validation(PRIORITY_RANGE)),
    }
}

/// Accepts RFC 3339 timestamps, plus bare `YYYY-MM-DDTHH:MM:SS` and
/// `YYYY-MM-DD` which are taken as UTC.
pub fn parse_due_date(raw: &str) -> Result<OffsetDateTime, AppError> {
    let raw = raw.trim();
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(ts);
    }
    if let Ok(ts) = PrimitiveDateTime::parse(
        raw,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Ok(ts.assume_utc());
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map(|d| d.midnight().assume_utc())
        .map_err(|_| AppError::validation(DUE_DATE_FORMAT))
}

fn due_date(value: &Value) -> Result<Option<OffsetDateTime>, AppError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => parse_due_date(s).map(Some),
        _ => Err(AppError::validation(DUE_DATE_FORMAT)),
    }
}

fn description(value: &Value) -> Result<Option<String>, AppError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        _ => Err(AppError::validation(DESCRIPTION_TYPE)),
    }
}

/// Validate a (sanitized) create payload.
pub fn new_todo(body: &Map<String, Value>) -> Result<NewTodo, AppError> {
    let title = match body.get("title") {
        Some(v @ Value::String(s)) if !s.is_empty() => title(v)?,
        _ => return Err(AppError::validation(TITLE_REQUIRED)),
    };

    let description = match body.get("description") {
        Some(v) => description(v)?,
        None => None,
    };

    let priority = match body.get("priority") {
        None | Some(Value::Null) => DEFAULT_PRIORITY,
        Some(v) => priority(v)?,
    };

    let due_date = match body.get("due_date") {
        None => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(v) => due_date(v)?,
    };

    Ok(NewTodo {
        title,
        description,
        priority,
        due_date,
    })
}

/// Validate a (sanitized) update payload. Unknown keys are ignored; a
/// payload with no recognized field is rejected.
pub fn todo_patch(body: &Map<String, Value>) -> Result<TodoPatch, AppError> {
    let patch = TodoPatch {
        title: body.get("title").map(title).transpose()?,
        description: body.get("description").map(description).transpose()?,
        priority: body.get("priority").map(priority).transpose()?,
        due_date: body.get("due_date").map(due_date).transpose()?,
        completed: body
            .get("completed")
            .map(|v| v.as_bool().ok_or_else(|| AppError::validation(COMPLETED_TYPE)))
            .transpose()?,
    };

    if patch.is_empty() {
        return Err(AppError::validation(NOTHING_TO_UPDATE));
    }
    Ok(patch)
}

/// Turn the raw query string into filters and a page window. Unparseable
/// values fall back to the defaults.
pub fn list_params(query: &ListQuery) -> (TodoFilter, Page) {
    let filter = TodoFilter {
        completed: query.completed.as_deref().map(|v| v == "true"),
        priority: query
            .priority
            .as_deref()
            .and_then(|v| v.trim().parse::<i32>().ok()),
    };

    let defaults = Page::default();
    let page = query
        .page
        .as_deref()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map_or(defaults.page, |p| p.max(1));
    let limit = query
        .limit
        .as_deref()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map_or(defaults.limit, |l| l.clamp(1, MAX_LIMIT));

    (filter, Page { page, limit })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn validation_message(err: AppError) -> String {
        assert!(matches!(err, AppError::Validation(_)), "{err:?}");
        err.to_string()
    }

    #[test]
    fn todo_id_must_be_numeric() {
        assert_eq!(parse_todo_id("42").unwrap(), 42);
        assert_eq!(
            validation_message(parse_todo_id("abc").unwrap_err()),
            "Valid todo ID is required"
        );
        assert!(parse_todo_id("").is_err());
        assert!(parse_todo_id("1.5").is_err());
    }

    #[test]
    fn create_applies_defaults() {
        let todo = new_todo(&body(json!({ "title": "  Buy milk " }))).unwrap();
        assert_eq!(
            todo,
            NewTodo {
                title: "Buy milk".into(),
                description: None,
                priority: 1,
                due_date: None,
            }
        );
    }

    #[test]
    fn create_requires_string_title() {
        for payload in [json!({}), json!({ "title": "" }), json!({ "title": 7 })] {
            assert_eq!(validation_message(new_todo(&body(payload)).unwrap_err()), TITLE_REQUIRED);
        }
    }

    #[test]
    fn create_checks_title_length() {
        let blank = new_todo(&body(json!({ "title": "   " }))).unwrap_err();
        assert_eq!(validation_message(blank), TITLE_LENGTH);

        let long = new_todo(&body(json!({ "title": "x".repeat(256) }))).unwrap_err();
        assert_eq!(validation_message(long), TITLE_LENGTH);

        assert!(new_todo(&body(json!({ "title": "x".repeat(255) }))).is_ok());
    }

    #[test]
    fn create_checks_priority_range() {
        for bad in [json!(0), json!(4), json!(2.5), json!("high"), json!(true)] {
            let err = new_todo(&body(json!({ "title": "t", "priority": bad }))).unwrap_err();
            assert_eq!(validation_message(err), PRIORITY_RANGE);
        }
        let todo = new_todo(&body(json!({ "title": "t", "priority": "3" }))).unwrap();
        assert_eq!(todo.priority, 3);
    }

    #[test]
    fn create_checks_description_type() {
        let err = new_todo(&body(json!({ "title": "t", "description": 12 }))).unwrap_err();
        assert_eq!(validation_message(err), DESCRIPTION_TYPE);
    }

    #[test]
    fn due_date_formats() {
        assert_eq!(
            parse_due_date("2025-03-01T10:30:00Z").unwrap(),
            datetime!(2025-03-01 10:30:00 UTC)
        );
        assert_eq!(
            parse_due_date("2025-03-01T10:30:00+02:00").unwrap(),
            datetime!(2025-03-01 08:30:00 UTC)
        );
        assert_eq!(
            parse_due_date("2025-03-01T10:30:00").unwrap(),
            datetime!(2025-03-01 10:30:00 UTC)
        );
        assert_eq!(parse_due_date("2025-03-01").unwrap(), datetime!(2025-03-01 0:00 UTC));
        assert!(parse_due_date("2025-02-30").is_err());
        assert!(parse_due_date("tomorrow").is_err());
    }

    #[test]
    fn create_rejects_invalid_due_date() {
        let err = new_todo(&body(json!({ "title": "t", "due_date": "soon" }))).unwrap_err();
        assert_eq!(validation_message(err), DUE_DATE_FORMAT);
    }

    #[test]
    fn patch_without_recognized_fields_is_rejected() {
        let err = todo_patch(&body(json!({ "owner": "someone-else" }))).unwrap_err();
        assert_eq!(validation_message(err), NOTHING_TO_UPDATE);
        assert!(todo_patch(&Map::new()).is_err());
    }

    #[test]
    fn patch_keeps_omitted_and_cleared_apart() {
        let patch = todo_patch(&body(json!({ "description": null, "completed": true }))).unwrap();
        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.due_date, None);
        assert_eq!(patch.completed, Some(true));
        assert_eq!(patch.title, None);
    }

    #[test]
    fn patch_validates_each_present_field() {
        let cases = [
            (json!({ "title": "" }), TITLE_LENGTH),
            (json!({ "title": null }), TITLE_LENGTH),
            (json!({ "priority": 9 }), PRIORITY_RANGE),
            (json!({ "priority": null }), PRIORITY_RANGE),
            (json!({ "due_date": "nope" }), DUE_DATE_FORMAT),
            (json!({ "description": ["a"] }), DESCRIPTION_TYPE),
            (json!({ "completed": "true" }), COMPLETED_TYPE),
            (json!({ "completed": 1 }), COMPLETED_TYPE),
        ];
        for (payload, expected) in cases {
            let err = todo_patch(&body(payload)).unwrap_err();
            assert_eq!(validation_message(err), expected);
        }
    }

    #[test]
    fn list_params_defaults_and_clamping() {
        let (filter, page) = list_params(&ListQuery::default());
        assert_eq!(filter, TodoFilter::default());
        assert_eq!(page, Page { page: 1, limit: 10 });

        let (filter, page) = list_params(&ListQuery {
            completed: Some("true".into()),
            priority: Some("2".into()),
            page: Some("0".into()),
            limit: Some("1000".into()),
        });
        assert_eq!(filter.completed, Some(true));
        assert_eq!(filter.priority, Some(2));
        assert_eq!(page, Page { page: 1, limit: MAX_LIMIT });

        let (filter, page) = list_params(&ListQuery {
            completed: Some("no".into()),
            priority: Some("x".into()),
            page: Some("abc".into()),
            limit: Some("5".into()),
        });
        assert_eq!(filter.completed, Some(false));
        assert_eq!(filter.priority, None);
        assert_eq!(page, Page { page: 1, limit: 5 });
    }
}
