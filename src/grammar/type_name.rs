//! Built-in type names and their aliases.
use crate::ir::{BaseType, Format};

static BUILTIN_TYPES: &[(&str, BaseType)] = &[
    ("string", BaseType::String),
    ("str", BaseType::String),
    ("number", BaseType::Number),
    ("integer", BaseType::Integer),
    ("int", BaseType::Integer),
    ("boolean", BaseType::Boolean),
    ("bool", BaseType::Boolean),
    ("object", BaseType::Object),
    ("array", BaseType::Array),
    ("null", BaseType::Null),
    ("any", BaseType::Any),
    ("email", BaseType::Format(Format::Email)),
    ("url", BaseType::Format(Format::Url)),
    ("uri", BaseType::Format(Format::Url)),
    ("uuid", BaseType::Format(Format::Uuid)),
    ("date", BaseType::Format(Format::Date)),
    ("datetime", BaseType::Format(Format::DateTime)),
    ("date-time", BaseType::Format(Format::DateTime)),
    ("time", BaseType::Format(Format::Time)),
    ("ipv4", BaseType::Format(Format::Ipv4)),
    ("ipv6", BaseType::Format(Format::Ipv6)),
    ("hostname", BaseType::Format(Format::Hostname)),
    ("slug", BaseType::Format(Format::Slug)),
    ("alphanum", BaseType::Format(Format::Alphanum)),
    ("hexColor", BaseType::Format(Format::HexColor)),
    ("hexcolor", BaseType::Format(Format::HexColor)),
    ("objectId", BaseType::Format(Format::ObjectId)),
    ("objectid", BaseType::Format(Format::ObjectId)),
];

pub fn lookup(name: &str) -> Option<BaseType> {
    BUILTIN_TYPES.iter().find(|(n, _)| *n == name).map(|(_, t)| *t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_canonical_types() {
        assert_eq!(lookup("str"), Some(BaseType::String));
        assert_eq!(lookup("int"), Some(BaseType::Integer));
        assert_eq!(lookup("date-time"), lookup("datetime"));
        assert_eq!(lookup("uri"), Some(BaseType::Format(Format::Url)));
        assert_eq!(lookup("phone"), None);
        assert_eq!(lookup("String"), None);
    }
}
