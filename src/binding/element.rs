use std::str::FromStr;

use roxmltree::Node;

use crate::error::SchemaError;

/// An XML element together with its location in the document.
///
/// Locations are rendered as `database/tables/table[Book]/columns`, using the
/// `name` attribute when the element has one.
#[derive(Clone)]
pub(crate) struct Element<'a, 'input> {
    node: Node<'a, 'input>,
    tag: String,
    path: String,
}

impl<'a, 'input> Element<'a, 'input> {
    pub(crate) fn root(node: Node<'a, 'input>) -> Self {
        let tag = node.tag_name().name().to_string();
        let path = Self::segment(&tag, node);
        Self { node, tag, path }
    }

    fn segment(tag: &str, node: Node<'a, 'input>) -> String {
        match node.attribute("name") {
            Some(name) => format!("{}[{}]", tag, name),
            None => tag.to_string(),
        }
    }

    pub(crate) fn tag(&self) -> &str {
        &self.tag
    }

    #[cfg(test)]
    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn namespace(&self) -> Option<String> {
        self.node.tag_name().namespace().map(str::to_string)
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> SchemaError {
        SchemaError::binding(self.path.clone(), message)
    }

    pub(crate) fn attr(&self, name: &str) -> Option<String> {
        self.node.attribute(name).map(str::to_string)
    }

    pub(crate) fn required(&self, name: &str) -> Result<String, SchemaError> {
        match self.node.attribute(name) {
            Some(value) if !value.trim().is_empty() => Ok(value.to_string()),
            Some(_) => Err(self.error(format!("attribute '{}' must not be empty", name))),
            None => Err(self.error(format!("missing required attribute '{}'", name))),
        }
    }

    /// Boolean attribute with the schema's default when absent
    pub(crate) fn flag(&self, name: &str, default: bool) -> Result<bool, SchemaError> {
        match self.node.attribute(name) {
            None => Ok(default),
            Some(value) => parse_bool(value).ok_or_else(|| {
                self.error(format!("attribute '{}' is not a boolean: '{}'", name, value))
            }),
        }
    }

    pub(crate) fn optional_flag(&self, name: &str) -> Result<Option<bool>, SchemaError> {
        match self.node.attribute(name) {
            None => Ok(None),
            Some(_) => self.flag(name, false).map(Some),
        }
    }

    pub(crate) fn number<T: FromStr>(&self, name: &str) -> Result<Option<T>, SchemaError> {
        match self.node.attribute(name) {
            None => Ok(None),
            Some(value) => value.trim().parse::<T>().map(Some).map_err(|_| {
                self.error(format!("attribute '{}' is not a valid number: '{}'", name, value))
            }),
        }
    }

    /// Reject attributes outside `allowed`. Attributes in a namespace (such
    /// as `xsi:schemaLocation`) are ignored.
    pub(crate) fn check_attributes(&self, allowed: &[&str]) -> Result<(), SchemaError> {
        for attribute in self.node.attributes() {
            if attribute.namespace().is_some() {
                continue;
            }
            if !allowed.contains(&attribute.name()) {
                return Err(self.error(format!("unexpected attribute '{}'", attribute.name())));
            }
        }
        Ok(())
    }

    /// Child elements in document order
    pub(crate) fn children(&self) -> Vec<Element<'a, 'input>> {
        self.node
            .children()
            .filter(|child| child.is_element())
            .map(|child| {
                let tag = child.tag_name().name().to_string();
                let path = format!("{}/{}", self.path, Self::segment(&tag, child));
                Element {
                    node: child,
                    tag,
                    path,
                }
            })
            .collect()
    }

    /// Child elements, all of which must be named `tag`
    pub(crate) fn children_named(&self, tag: &str) -> Result<Vec<Element<'a, 'input>>, SchemaError> {
        let children = self.children();
        if let Some(other) = children.iter().find(|child| child.tag != tag) {
            return Err(other.error(format!(
                "unexpected element '{}' inside '{}'",
                other.tag, self.tag
            )));
        }
        Ok(children)
    }

    /// Check that every child is one of `allowed` and appears at most once
    pub(crate) fn check_unique_children(&self, allowed: &[&str]) -> Result<(), SchemaError> {
        let children = self.children();
        for (i, child) in children.iter().enumerate() {
            if !allowed.contains(&child.tag()) {
                return Err(child.error(format!(
                    "unexpected element '{}' inside '{}'",
                    child.tag, self.tag
                )));
            }
            if children[..i].iter().any(|prev| prev.tag == child.tag) {
                return Err(child.error(format!("element '{}' may appear only once", child.tag)));
            }
        }
        Ok(())
    }

    pub(crate) fn child(&self, tag: &str) -> Option<Element<'a, 'input>> {
        self.children().into_iter().find(|child| child.tag == tag)
    }
}

/// Parse an `xs:boolean`-like value
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "t" => Some(true),
        "false" | "0" | "no" | "f" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool(" YES "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_paths_use_name_attribute() {
        let doc = roxmltree::Document::parse(
            r#"<database name="Db"><tables><table name="Book"/></tables></database>"#,
        )
        .unwrap();
        let root = Element::root(doc.root_element());
        let tables = root.child("tables").unwrap();
        let table = &tables.children()[0];
        assert_eq!(table.path(), "database[Db]/tables/table[Book]");
    }

    #[test]
    fn test_check_attributes_ignores_namespaced() {
        let doc = roxmltree::Document::parse(
            r#"<database xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
                        xsi:schemaLocation="x y" name="Db" bogus="1"/>"#,
        )
        .unwrap();
        let root = Element::root(doc.root_element());
        let err = root.check_attributes(&["name"]).unwrap_err();
        assert!(err.to_string().contains("bogus"));
        assert!(root.check_attributes(&["name", "bogus"]).is_ok());
    }
}
