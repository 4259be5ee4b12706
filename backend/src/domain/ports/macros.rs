//! Helper macro for declaring port error enums.
//!
//! Each variant gets a snake-case constructor whose parameters accept
//! anything convertible into the field types, so adapters can write
//! `ReplayRepositoryError::query(err.to_string())` or pass a `&str`.

macro_rules! define_port_error {
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:literal
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field: $ty),* } )?,
            )*
        }

        ::paste::paste! {
            impl $name {
                $(
                    pub fn [<$variant:snake>]($($($field: impl Into<$ty>),*)?) -> Self {
                        Self::$variant $( { $($field: $field.into()),* } )?
                    }
                )*
            }
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    define_port_error! {
        pub enum SamplePortError {
            Unreachable => "collaborator unreachable",
            Query { message: String } => "query failed: {message}",
            Rejected { status: u16, body: String } => "rejected with {status}: {body}",
        }
    }

    #[test]
    fn unit_variants_get_argument_free_constructors() {
        assert_eq!(SamplePortError::unreachable(), SamplePortError::Unreachable);
    }

    #[test]
    fn string_fields_accept_str() {
        let err = SamplePortError::query("timeout");
        assert_eq!(err.to_string(), "query failed: timeout");
    }

    #[test]
    fn mixed_fields_keep_their_types() {
        let err = SamplePortError::rejected(503_u16, "busy");
        assert_eq!(err.to_string(), "rejected with 503: busy");
    }
}
