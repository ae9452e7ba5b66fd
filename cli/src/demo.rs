//! Demo steps against a JSONPlaceholder-style posts API.

use std::collections::HashMap;

use steprun_core::{
    Extract, JwtAuth, LogPayload, NotFound, Registry, Session, Step, UpdateSession, HOST_KEY,
};

pub const DEFAULT_HOST: &str = "https://jsonplaceholder.typicode.com";

/// Session preset for the demo: the default host, overridable with `-s host=...`.
pub fn session() -> Session {
    Session::from_values(HashMap::from([(
        HOST_KEY.to_string(),
        DEFAULT_HOST.to_string(),
    )]))
}

pub fn registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .add(
            "login",
            Step::get("/users/1")
                .with_pre_processor(UpdateSession::new("jwt_token", "eyJhbGciOiJIUzI1NiIsInR5cC..."))
                .with_pre_processor(JwtAuth),
        )
        .add(
            "list-posts",
            Step::get("/posts").with_post_processor(Extract::new("id", "0.id")),
        )
        .add("get-post", Step::get("/posts/${id}"))
        .add(
            "create-post",
            Step::post(
                "/posts",
                r#"{"title": "Michael G Scott", "body": "Regional Manager ${randomUUID}", "userId": 1}"#,
                "application/json",
            )
            .with_post_processor(Extract::new("id", "id"))
            .with_post_processor(LogPayload),
        )
        .add(
            "update-post",
            Step::put(
                "/posts/${id}",
                r#"{"id": ${id}, "title": "Assistant to the Regional Manager", "userId": 1}"#,
                "application/json",
            )
            .with_post_processor(LogPayload),
        )
        .add("delete-post", Step::delete("/posts/${id}"))
        .add("missing-post", Step::get("/post/${id}").expecting(NotFound));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_demo_steps() {
        assert_eq!(
            registry().names(),
            [
                "create-post",
                "delete-post",
                "get-post",
                "list-posts",
                "login",
                "missing-post",
                "update-post"
            ]
        );
    }

    #[test]
    fn session_defaults_host() {
        assert_eq!(session().get(HOST_KEY).as_deref(), Some(DEFAULT_HOST));
    }
}
