//! Resource addressing.

use crate::resource::Resource;

/// Derives the URI a resource is published under.
pub trait ResourceLoader: Send + Sync {
    fn uri_for(&self, name: &str, resource: &Resource) -> String;
}

/// Maps each resource variant to a scheme and addresses it as `{scheme}://{name}`.
/// An explicit `uri` on the resource wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemeLoader;

impl ResourceLoader for SchemeLoader {
    fn uri_for(&self, name: &str, resource: &Resource) -> String {
        match resource.explicit_uri() {
            Some(uri) => uri.to_string(),
            None => format!("{}://{name}", resource.resource_type().uri_scheme()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scheme_per_variant() {
        let cases = [
            (json!({"type": "path", "path": "/etc/hosts"}), "file://hosts"),
            (json!({"type": "text", "content": "x"}), "text://hosts"),
            (json!({"type": "command", "command": "ls"}), "cli://hosts"),
            (json!({"type": "source", "import_path": "a.b"}), "python://hosts"),
            (json!({"type": "callable", "import_path": "a.b"}), "callable://hosts"),
            (json!({"type": "image", "path": "a.png"}), "image://hosts"),
        ];
        for (payload, expected) in cases {
            let resource = Resource::from_value(payload).unwrap();
            assert_eq!(SchemeLoader.uri_for("hosts", &resource), expected);
        }
    }

    #[test]
    fn explicit_uri_wins() {
        let resource =
            Resource::from_value(json!({"type": "text", "content": "x", "uri": "memo://a"}))
                .unwrap();
        assert_eq!(SchemeLoader.uri_for("doc", &resource), "memo://a");
    }
}
