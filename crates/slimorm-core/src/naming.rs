//! Naming strategies mapping model and field names to physical names.

use std::fmt::Debug;

/// Maps logical table/column names to physical ones.
pub trait NamingStrategy: Debug + Send + Sync {
    fn table_name(&self, name: &str) -> String;

    fn column_name(&self, name: &str) -> String;
}

/// Uses names exactly as declared.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughNaming;

impl NamingStrategy for PassThroughNaming {
    fn table_name(&self, name: &str) -> String {
        name.to_string()
    }

    fn column_name(&self, name: &str) -> String {
        name.to_string()
    }
}

/// `CustomerOrder` -> `customer_order`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowercaseUnderscoreNaming;

impl NamingStrategy for LowercaseUnderscoreNaming {
    fn table_name(&self, name: &str) -> String {
        to_snake_case(name)
    }

    fn column_name(&self, name: &str) -> String {
        to_snake_case(name)
    }
}

/// Upper-cases every identifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpperCaseNaming;

impl NamingStrategy for UpperCaseNaming {
    fn table_name(&self, name: &str) -> String {
        name.to_uppercase()
    }

    fn column_name(&self, name: &str) -> String {
        name.to_uppercase()
    }
}

/// Prepends a fixed prefix to table names; columns pass through.
#[derive(Debug, Clone)]
pub struct PrefixTableNaming {
    pub prefix: String,
}

impl PrefixTableNaming {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl NamingStrategy for PrefixTableNaming {
    fn table_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    fn column_name(&self, name: &str) -> String {
        name.to_string()
    }
}

/// Convert `PascalCase`/`camelCase` to `snake_case`.
///
/// Acronym runs stay together (`HTTPServer` -> `http_server`); existing
/// underscores are kept.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p == '_' => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_through() {
        assert_eq!(PassThroughNaming.table_name("Post"), "Post");
        assert_eq!(PassThroughNaming.column_name("CustomerId"), "CustomerId");
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("CustomerId"), "customer_id");
        assert_eq!(to_snake_case("customerId"), "customer_id");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("Address2Line"), "address2_line");
        assert_eq!(to_snake_case("Id"), "id");
    }

    #[test]
    fn test_lowercase_underscore_strategy() {
        let s = LowercaseUnderscoreNaming;
        assert_eq!(s.table_name("OrderLine"), "order_line");
        assert_eq!(s.column_name("UnitPrice"), "unit_price");
    }

    #[test]
    fn test_prefix_strategy() {
        let s = PrefixTableNaming::new("app_");
        assert_eq!(s.table_name("Post"), "app_Post");
        assert_eq!(s.column_name("Title"), "Title");
        assert_eq!(UpperCaseNaming.table_name("Post"), "POST");
    }
}
