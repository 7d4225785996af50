//! Shared macros for the backend crate.

/// Implement `fmt::Debug` for a struct while hiding secret fields.
///
/// Each field is listed with one of three keywords:
///
/// - `show field` prints the value as usual
/// - `redact field` prints `"[REDACTED]"`
/// - `redact_option field` prints `Some("[REDACTED]")` or `None`
///
/// ```ignore
/// redacted_debug!(Config {
///     redact database_url,
///     show bind_address,
///     redact_option admin_password,
/// });
/// ```
macro_rules! redacted_debug {
    ($name:ident { $( $kind:ident $field:ident ),* $(,)? }) => {
        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                let mut s = f.debug_struct(stringify!($name));
                $( redacted_debug!(@field s, self, $kind, $field); )*
                s.finish_non_exhaustive()
            }
        }
    };
    (@field $s:ident, $self:ident, show, $field:ident) => {
        $s.field(stringify!($field), &$self.$field);
    };
    (@field $s:ident, $self:ident, redact, $field:ident) => {
        $s.field(stringify!($field), &"[REDACTED]");
    };
    (@field $s:ident, $self:ident, redact_option, $field:ident) => {
        $s.field(stringify!($field), &$self.$field.as_ref().map(|_| "[REDACTED]"));
    };
}

#[cfg(test)]
mod tests {
    #[allow(dead_code)]
    struct Credentials {
        username: String,
        password: String,
        recovery_code: Option<String>,
    }

    redacted_debug!(Credentials {
        show username,
        redact password,
        redact_option recovery_code,
    });

    #[test]
    fn test_secret_fields_are_hidden() {
        let creds = Credentials {
            username: "quartermaster".to_string(),
            password: "correct-horse".to_string(),
            recovery_code: Some("A1B2C3".to_string()),
        };
        let output = format!("{:?}", creds);
        assert!(output.contains("quartermaster"));
        assert!(!output.contains("correct-horse"));
        assert!(!output.contains("A1B2C3"));
        assert!(output.contains("[REDACTED]"));
    }

    #[test]
    fn test_missing_optional_secret_shows_none() {
        let creds = Credentials {
            username: "depot".to_string(),
            password: "pw".to_string(),
            recovery_code: None,
        };
        assert!(format!("{:?}", creds).contains("None"));
    }
}
