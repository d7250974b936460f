//! Request methods the router can register handlers for.
//!
//! The table below drives the enum, its wire names and the lower-case verb
//! names of the registration API (`app.get`, `app.mkcol`, `app.r#move`, ...).
//! Requests with any other method are answered `405 Method Not Allowed`
//! before they reach a handler.

use std::fmt;
use std::str::FromStr;

macro_rules! methods {
    ($($(#[$doc:meta])* $variant:ident => $wire:literal, $verb:literal;)*) => {
        /// A known HTTP method.
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        pub enum Method {
            $($(#[$doc])* $variant,)*
        }

        impl Method {
            /// Every method, in the order the registration API lists them.
            pub const ALL: &'static [Method] = &[$(Self::$variant),*];

            /// The upper-case wire name (`"GET"`).
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)*
                }
            }

            /// The lower-case name of the registration method (`"get"`).
            pub fn verb(self) -> &'static str {
                match self {
                    $(Self::$variant => $verb,)*
                }
            }
        }

        /// Case-sensitive, as method names are (RFC 9110 §9.1).
        impl FromStr for Method {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, ()> {
                match s {
                    $($wire => Ok(Self::$variant),)*
                    _ => Err(()),
                }
            }
        }
    };
}

methods! {
    Get => "GET", "get";
    Post => "POST", "post";
    Put => "PUT", "put";
    Delete => "DELETE", "delete";
    Patch => "PATCH", "patch";
    Head => "HEAD", "head";
    Options => "OPTIONS", "options";
    Connect => "CONNECT", "connect";
    Trace => "TRACE", "trace";
    /// WebDAV (RFC 4918).
    Copy => "COPY", "copy";
    Lock => "LOCK", "lock";
    Mkcol => "MKCOL", "mkcol";
    Move => "MOVE", "move";
    Propfind => "PROPFIND", "propfind";
    Proppatch => "PROPPATCH", "proppatch";
    Unlock => "UNLOCK", "unlock";
    /// CalDAV (RFC 4791).
    Mkcalendar => "MKCALENDAR", "mkcalendar";
    /// RFC 3253.
    Report => "REPORT", "report";
    /// RFC 5323.
    Search => "SEARCH", "search";
    /// Cache invalidation.
    Purge => "PURGE", "purge";
}

impl TryFrom<&http::Method> for Method {
    type Error = ();

    fn try_from(method: &http::Method) -> Result<Self, ()> {
        method.as_str().parse()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_method_parses_from_its_wire_name() {
        for &method in Method::ALL {
            assert_eq!(method.as_str().parse::<Method>(), Ok(method));
            assert_eq!(method.verb().to_uppercase(), method.as_str());
        }
        assert_eq!(Method::ALL.len(), 20);
    }

    #[test]
    fn method_names_are_case_sensitive() {
        assert!("get".parse::<Method>().is_err());
        assert_eq!(Method::try_from(&http::Method::DELETE), Ok(Method::Delete));
        assert!(Method::try_from(&http::Method::from_bytes(b"BREW").unwrap()).is_err());
    }
}
