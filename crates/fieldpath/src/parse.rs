use crate::{path::PathBuf, Element};
use peg::str::LineCol;
use serde_json::Value;

peg::parser! {
    grammar parser() for str {
        rule quoted_field() -> Element
            = ".\"" name:$(("\\\"" / (!['"'][_]))+) "\"" {
                Element::Field(name.replace("\\\"", "\""))
            }
        rule field() -> Element
            = "." name:$((!['.' | '\n' | '[' | '"'][_])+) {
                Element::Field(name.to_owned())
            }
        rule index() -> Element
            = "[" idx:$(['0'..='9']+) "]" {?
                idx.parse().map(Element::Index).or(Err("index"))
            }
        rule selector() -> Element
            = "[" key:$((!['=' | ']'][_])+) "=\"" value:$((!['"'][_])*) "\"]" {
                Element::Select(key.to_owned(), Value::String(value.to_owned()))
            }
        rule element() -> Element
            = quoted_field()
            / field()
            / index()
            / selector()

        pub rule path() -> PathBuf
            = path:element()+ { PathBuf(path) }
    }
}

pub fn parse(input: &str) -> Result<PathBuf, peg::error::ParseError<LineCol>> {
    parser::path(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use Element::*;

    #[test]
    fn plain_fields() {
        assert_eq!(
            parse(".metadata.name").unwrap(),
            PathBuf(vec![Field("metadata".to_owned()), Field("name".to_owned())])
        );
    }

    #[test]
    fn quoted_field_with_dots() {
        let path = parse(".metadata.labels.\"app.kubernetes.io/name\"").unwrap();
        assert_eq!(
            path.last(),
            Some(&Field("app.kubernetes.io/name".to_owned()))
        );
        assert_eq!(path.to_string(), ".metadata.labels.\"app.kubernetes.io/name\"");
    }

    #[test]
    fn index_and_selector() {
        let path = parse(".spec.containers[name=\"nginx\"].ports[0]").unwrap();
        assert_eq!(
            path,
            PathBuf(vec![
                Field("spec".to_owned()),
                Field("containers".to_owned()),
                Select("name".to_owned(), Value::String("nginx".to_owned())),
                Field("ports".to_owned()),
                Index(0),
            ])
        );
        assert_eq!(path.to_string(), ".spec.containers[name=\"nginx\"].ports[0]");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("metadata").is_err());
        assert!(parse("").is_err());
    }
}
