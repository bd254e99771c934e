//! Client mutations of the session state.

use super::filters::filters_from_query_params;
use super::ContentError;
use crate::payload::Payload;
use crate::state::SessionState;

pub const REQUEST_SET_CONTENT_PATH: &str = "setContentPath";
pub const REQUEST_SET_NAMESPACE: &str = "setNamespace";
pub const REQUEST_SET_QUERY_PARAMS: &str = "setQueryParams";

fn required_string(payload: &Payload, field: &'static str) -> Result<String, ContentError> {
    payload
        .string(field)
        .map_err(|source| ContentError::Payload { field, source })
}

/// `{contentPath: string}`. Subscribers of the session see the change.
pub fn set_content_path(state: &SessionState, payload: &Payload) -> Result<(), ContentError> {
    let content_path = required_string(payload, "contentPath")?;
    state.set_content_path(content_path);
    Ok(())
}

/// `{namespace: string}`.
pub fn set_namespace(state: &SessionState, payload: &Payload) -> Result<(), ContentError> {
    let namespace = required_string(payload, "namespace")?;
    state.set_namespace(namespace);
    Ok(())
}

/// `{params: {filters?: ...}}`. Without `filters` the current filters stay.
pub fn set_query_params(state: &SessionState, payload: &Payload) -> Result<(), ContentError> {
    let params = payload
        .object("params")
        .map_err(|source| ContentError::Payload {
            field: "params",
            source,
        })?;

    if let Some(filters) = params.and_then(|params| params.get("filters")) {
        let filters = filters_from_query_params(filters)?;
        state.set_filters(filters);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::PayloadError;
    use crate::state::Filter;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> Payload {
        Payload::try_from(value).unwrap()
    }

    #[test]
    fn sets_content_path() {
        let state = SessionState::new();
        set_content_path(&state, &payload(json!({"contentPath": "/content/overview"}))).unwrap();
        assert_eq!(state.content_path(), "/content/overview");
    }

    #[test]
    fn content_path_must_be_a_string() {
        let state = SessionState::new();
        let err = set_content_path(&state, &payload(json!({"contentPath": 7}))).unwrap_err();
        assert!(matches!(
            err,
            ContentError::Payload {
                field: "contentPath",
                source: PayloadError::WrongType { .. }
            }
        ));
        assert_eq!(
            err.to_string(),
            "extract contentPath from payload: payload key \"contentPath\" is not a string"
        );
        assert_eq!(state.content_path(), "");
    }

    #[test]
    fn sets_namespace() {
        let state = SessionState::new();
        set_namespace(&state, &payload(json!({"namespace": "kube-system"}))).unwrap();
        assert_eq!(state.namespace(), "kube-system");

        let err = set_namespace(&state, &Payload::new()).unwrap_err();
        assert!(matches!(
            err,
            ContentError::Payload {
                source: PayloadError::MissingKey(_),
                ..
            }
        ));
    }

    #[test]
    fn sets_filters_from_query_params() {
        let state = SessionState::new();
        set_query_params(
            &state,
            &payload(json!({"params": {"filters": ["app:nginx", "tier:web"]}})),
        )
        .unwrap();
        assert_eq!(
            state.filters(),
            vec![Filter::new("app", "nginx"), Filter::new("tier", "web")]
        );
    }

    #[test]
    fn query_params_without_filters_is_a_noop() {
        let state = SessionState::new();
        state.set_filters(vec![Filter::new("app", "nginx")]);

        set_query_params(&state, &payload(json!({"params": {"page": 2}}))).unwrap();
        set_query_params(&state, &Payload::new()).unwrap();
        assert_eq!(state.filters(), vec![Filter::new("app", "nginx")]);
    }

    #[test]
    fn malformed_filter_is_an_error() {
        let state = SessionState::new();
        let err = set_query_params(&state, &payload(json!({"params": {"filters": "nginx"}})))
            .unwrap_err();
        assert!(matches!(err, ContentError::Filters(_)));
        assert!(state.filters().is_empty());
    }
}
