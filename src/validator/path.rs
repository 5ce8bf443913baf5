use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
    Items,
}

/// Location of a value inside the validated document: `user.tags[0]`.
/// The root renders as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn key(&self, key: &str) -> Self {
        let mut next = self.0.clone();
        next.push(Segment::Key(key.to_string()));
        FieldPath(next)
    }

    pub fn index(&self, i: usize) -> Self {
        let mut next = self.0.clone();
        next.push(Segment::Index(i));
        FieldPath(next)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Every item of an array, for reporting a declaration site.
    pub fn items(&self) -> Self {
        let mut next = self.0.clone();
        next.push(Segment::Items);
        FieldPath(next)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            match seg {
                Segment::Key(k) if i == 0 => f.write_str(k)?,
                Segment::Key(k) => write!(f, ".{k}")?,
                Segment::Index(n) => write!(f, "[{n}]")?,
                Segment::Items => f.write_str("[]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_dots_and_indices() {
        let p = FieldPath::root().key("user").key("tags").index(2);
        assert_eq!(p.to_string(), "user.tags[2]");
        assert_eq!(FieldPath::root().index(0).key("id").to_string(), "[0].id");
        assert_eq!(FieldPath::root().to_string(), "");
        assert_eq!(FieldPath::root().key("tags").items().key("id").to_string(), "tags[].id");
    }
}
