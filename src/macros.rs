
/// Builds an `Id` from its encoded form at compile time, e.g. `ebml_id!(0x1A45DFA3)`. Fails to
/// compile (or panics, outside of a constant) if the id is reserved or not minimally encoded.
#[macro_export]
macro_rules! ebml_id {
    ($id:expr) => {
        match $crate::Id::from_encoded($id) {
            Some(id) => id,
            None => panic!("invalid EBML id"),
        }
    };
}

/// Use this macro to declare a leaf element type. Example usage:
///
/// ```rust
/// use ebml_tree::{cardinality, ebml_element, UintValue};
///
/// ebml_element! {
///     /// Milliseconds per tick.
///     pub enum TimestampScale {
///         id: 0x2AD7B1,
///         name: "TimestampScale",
///         value: UintValue,
///         cardinality: cardinality::ExactlyOne,
///         default: UintValue::from(1_000_000u32),
///     }
/// }
/// ```
///
/// This generates an empty enum named `TimestampScale` implementing `ElementType` and `Element`.
/// `levels: MinLevel => MaxLevel,` may follow the cardinality to restrict the nesting level; the
/// default is `AnyLevel`.
#[macro_export]
macro_rules! ebml_element {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            id: $id:expr,
            name: $element_name:expr,
            value: $value:ty,
            cardinality: $cardinality:ty,
            $(levels: $min:ty => $max:ty,)?
            $(default: $default:expr,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug)]
        $vis enum $name {}
        impl $crate::ElementType for $name {
            type Node = $crate::ElementImpl<$name>;
            type Cardinality = $cardinality;
            type MinAllowedLevel = $crate::__ebml_level!($($min)?);
            type MaxAllowedLevel = $crate::__ebml_level!($($max)?);
            const ID: $crate::Id = $crate::ebml_id!($id);
            const NAME: &'static str = $element_name;

            fn create() -> Self::Node {
                $crate::ElementImpl::new()
            }
        }
        impl $crate::Element for $name {
            type Value = $value;
            $crate::__ebml_default!($value; $($default)?);
        }
    };
}

/// Use this macro to declare a container type. Example usage:
///
/// ```rust
/// use ebml_tree::{cardinality, child_order, ebml_container, ebml_element, BinaryValue};
///
/// ebml_element! {
///     pub enum SeekId {
///         id: 0x53AB,
///         name: "SeekID",
///         value: BinaryValue,
///         cardinality: cardinality::ExactlyOne,
///     }
/// }
///
/// ebml_container! {
///     pub enum Seek {
///         id: 0x4DBB,
///         name: "Seek",
///         cardinality: cardinality::OneOrMany,
///         order: child_order::Insignificant,
///         children: [SeekId],
///     }
/// }
/// ```
///
/// The listed children, in order, form the container's `SemanticContext`; with
/// `child_order::Significant` that order is the canonical order used by `Master::sort`.
#[macro_export]
macro_rules! ebml_container {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            id: $id:expr,
            name: $container_name:expr,
            cardinality: $cardinality:ty,
            order: $order:ty,
            $(levels: $min:ty => $max:ty,)?
            children: [$($child:ty),* $(,)?] $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug)]
        $vis enum $name {}
        impl $crate::ElementType for $name {
            type Node = $crate::Master;
            type Cardinality = $cardinality;
            type MinAllowedLevel = $crate::__ebml_level!($($min)?);
            type MaxAllowedLevel = $crate::__ebml_level!($($max)?);
            const ID: $crate::Id = $crate::ebml_id!($id);
            const NAME: &'static str = $container_name;

            fn create() -> $crate::Master {
                $crate::Master::new(<$name as $crate::Container>::context(), true)
            }
        }
        impl $crate::Container for $name {
            type ChildOrder = $order;

            fn context() -> &'static $crate::SemanticContext {
                static CONTEXT: $crate::SemanticContext = $crate::SemanticContext {
                    id: <$name as $crate::ElementType>::ID,
                    name: <$name as $crate::ElementType>::NAME,
                    ordered: <$order as $crate::child_order::ChildOrder>::SIGNIFICANT,
                    children: &[$($crate::ChildDescriptor::of::<$child>()),*],
                };
                &CONTEXT
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __ebml_level {
    () => {
        $crate::AnyLevel
    };
    ($level:ty) => {
        $level
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __ebml_default {
    ($value:ty;) => {};
    ($value:ty; $default:expr) => {
        fn default_value() -> Option<$value> {
            Some($default)
        }
    };
}
