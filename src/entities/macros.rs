//! Macros for reducing boilerplate when defining documents
//!
//! The record structs are written by hand (their serde attributes differ
//! per field); these macros generate the repetitive trait implementations.

/// Implement [`Document`](crate::core::Document) for a struct with a
/// `pub id: String` field, optionally with declarative validation.
///
/// # Example
///
/// ```rust,ignore
/// impl_document!(
///     Client,
///     "clients",
///     "client",
///     ["name", "email", "phone"],
///     validate: {
///         create: {
///             name: [required, string_length(1, 200)],
///             email: [optional, email],
///         },
///         update: {
///             name: [optional, string_length(1, 200)],
///         },
///     },
///     filters: {
///         create: {
///             name: [trim],
///             email: [trim, lowercase],
///         },
///     }
/// );
/// ```
#[macro_export]
macro_rules! impl_document {
    (
        $type:ident,
        $collection:expr,
        $singular:expr,
        [ $( $search_field:expr ),* $(,)? ]
        $(,)?
    ) => {
        impl $crate::core::document::Document for $type {
            fn collection() -> &'static str {
                $collection
            }

            fn singular() -> &'static str {
                $singular
            }

            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }

            fn searchable_fields() -> &'static [&'static str] {
                &[ $( $search_field ),* ]
            }
        }
    };

    (
        $type:ident,
        $collection:expr,
        $singular:expr,
        [ $( $search_field:expr ),* $(,)? ],
        validate: {
            $(
                $op:ident: {
                    $(
                        $val_field:ident: [ $( $validator:tt )* ]
                    ),* $(,)?
                }
            ),* $(,)?
        }
        $(,)?
        filters: {
            $(
                $fop:ident: {
                    $(
                        $fil_field:ident: [ $( $filter:tt )* ]
                    ),* $(,)?
                }
            ),* $(,)?
        }
        $(,)?
    ) => {
        $crate::impl_document!($type, $collection, $singular, [ $( $search_field ),* ]);

        impl $crate::core::validation::extractor::ValidatableEntity for $type {
            fn validation_config(
                operation: &str,
            ) -> $crate::core::validation::EntityValidationConfig {
                #[allow(unused_mut)]
                let mut config = $crate::core::validation::EntityValidationConfig::new($singular);

                $(
                    if operation == stringify!($op) {
                        $(
                            $crate::add_validators_for_field!(
                                config,
                                $crate::field_name!($val_field),
                                $( $validator )*
                            );
                        )*
                    }
                )*

                $(
                    if operation == stringify!($fop) {
                        $(
                            $crate::add_filters_for_field!(
                                config,
                                $crate::field_name!($fil_field),
                                $( $filter )*
                            );
                        )*
                    }
                )*

                config
            }
        }
    };
}

/// Stored field name for a rule key: snake_case keys map to the
/// camelCase names used by the store (`reorder_point` → `reorderPoint`)
#[macro_export]
macro_rules! field_name {
    ($field:ident) => {
        &$crate::entities::macros::camel_case(stringify!($field))
    };
}

/// Helper macro to add validators to a field
#[macro_export]
macro_rules! add_validators_for_field {
    ($config:expr, $field:expr, $(,)?) => {};

    ($config:expr, $field:expr, , $( $rest:tt )*) => {
        $crate::add_validators_for_field!($config, $field, $( $rest )*);
    };

    ($config:expr, $field:expr, required $( $rest:tt )*) => {
        $config.add_validator($field, $crate::core::validation::validators::required());
        $crate::add_validators_for_field!($config, $field, $( $rest )*);
    };

    ($config:expr, $field:expr, optional $( $rest:tt )*) => {
        $config.mark_optional($field);
        $crate::add_validators_for_field!($config, $field, $( $rest )*);
    };

    ($config:expr, $field:expr, non_negative $( $rest:tt )*) => {
        $config.add_validator($field, $crate::core::validation::validators::non_negative());
        $crate::add_validators_for_field!($config, $field, $( $rest )*);
    };

    ($config:expr, $field:expr, email $( $rest:tt )*) => {
        $config.add_validator($field, $crate::core::validation::validators::email());
        $crate::add_validators_for_field!($config, $field, $( $rest )*);
    };

    ($config:expr, $field:expr, string_length($min:expr, $max:expr) $( $rest:tt )*) => {
        $config.add_validator($field, $crate::core::validation::validators::string_length($min, $max));
        $crate::add_validators_for_field!($config, $field, $( $rest )*);
    };

    ($config:expr, $field:expr, in_list($( $value:expr ),* $(,)?) $( $rest:tt )*) => {
        $config.add_validator(
            $field,
            $crate::core::validation::validators::in_list(vec![$( $value.to_string() ),*]),
        );
        $crate::add_validators_for_field!($config, $field, $( $rest )*);
    };
}

/// Helper macro to add filters to a field
#[macro_export]
macro_rules! add_filters_for_field {
    ($config:expr, $field:expr, $(,)?) => {};

    ($config:expr, $field:expr, , $( $rest:tt )*) => {
        $crate::add_filters_for_field!($config, $field, $( $rest )*);
    };

    ($config:expr, $field:expr, trim $( $rest:tt )*) => {
        $config.add_filter($field, $crate::core::validation::filters::trim());
        $crate::add_filters_for_field!($config, $field, $( $rest )*);
    };

    ($config:expr, $field:expr, lowercase $( $rest:tt )*) => {
        $config.add_filter($field, $crate::core::validation::filters::lowercase());
        $crate::add_filters_for_field!($config, $field, $( $rest )*);
    };

    ($config:expr, $field:expr, round_decimals($decimals:expr) $( $rest:tt )*) => {
        $config.add_filter($field, $crate::core::validation::filters::round_decimals($decimals));
        $crate::add_filters_for_field!($config, $field, $( $rest )*);
    };
}

/// `reorder_point` → `reorderPoint`
pub fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
