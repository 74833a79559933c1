//! Helper macro for the store-error enums shared by every port.

/// Declare a port error enum with `thiserror` display strings and
/// snake-case shorthand constructors.
///
/// Variants either carry an adapter-supplied `message: String` or nothing
/// at all; richer payloads are rare enough to be written by hand.
macro_rules! define_store_error {
    (@ctor $name:ident, $variant:ident) => {
        ::paste::paste! {
            #[doc = concat!("Shorthand for [`", stringify!($name), "::", stringify!($variant), "`].")]
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };
    (@ctor $name:ident, $variant:ident { $field:ident: String }) => {
        ::paste::paste! {
            #[doc = concat!("Shorthand for [`", stringify!($name), "::", stringify!($variant), "`].")]
            pub fn [<$variant:snake>]($field: impl Into<String>) -> Self {
                Self::$variant { $field: $field.into() }
            }
        }
    };
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident $({ $field:ident: String })? => $msg:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[error($msg)]
                $variant $({
                    /// Adapter-provided description of the failure.
                    $field: String,
                })?,
            )*
        }

        impl $name {
            $(
                define_store_error!(@ctor $name, $variant $({ $field: String })?);
            )*
        }
    };
}

pub(crate) use define_store_error;

#[cfg(test)]
mod tests {
    define_store_error! {
        pub enum SampleError {
            Connection { message: String } => "sample connection failed: {message}",
            Busy => "sample is busy",
        }
    }

    #[test]
    fn message_constructors_accept_str() {
        let err = SampleError::connection("refused");
        assert_eq!(err.to_string(), "sample connection failed: refused");
    }

    #[test]
    fn unit_constructors_build_unit_variants() {
        assert_eq!(SampleError::busy(), SampleError::Busy);
        assert_eq!(SampleError::busy().to_string(), "sample is busy");
    }
}
