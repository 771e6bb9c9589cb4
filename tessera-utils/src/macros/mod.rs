//! hidden tessera macros

/// Generates a consuming `with_*` and a borrowing `set_*` variant
/// of a single builder method.
///
/// A parameter of type `Option<T>` additionally gets the
/// `maybe_with_*`, `maybe_set_*`, `without_*` and `unset_*` variants.
#[doc(hidden)]
#[macro_export]
macro_rules! __generate_set_and_with {
    (
        $(#[$outer_doc:meta])*
        $vis:vis fn $fn_name:ident(mut $self_token:ident, $param_name:ident: Option<$param_ty:ty> $(,)?) -> Self {
            $($body:tt)*
        }
    ) => {
        $crate::__private::paste! {
            $(#[$outer_doc])*
            #[must_use]
            $vis fn [<maybe_with_ $fn_name>](mut $self_token, $param_name: Option<$param_ty>) -> Self {
                $($body)*
            }

            $(#[$outer_doc])*
            $vis fn [<maybe_set_ $fn_name>](&mut $self_token, $param_name: Option<$param_ty>) -> &mut Self {
                $($body)*
            }

            $(#[$outer_doc])*
            #[must_use]
            $vis fn [<with_ $fn_name>](mut $self_token, $param_name: $param_ty) -> Self {
                let $param_name: Option<$param_ty> = Some($param_name);
                $($body)*
            }

            $(#[$outer_doc])*
            $vis fn [<set_ $fn_name>](&mut $self_token, $param_name: $param_ty) -> &mut Self {
                let $param_name: Option<$param_ty> = Some($param_name);
                $($body)*
            }

            $(#[$outer_doc])*
            #[must_use]
            $vis fn [<without_ $fn_name>](mut $self_token) -> Self {
                let $param_name: Option<$param_ty> = None;
                $($body)*
            }

            $(#[$outer_doc])*
            $vis fn [<unset_ $fn_name>](&mut $self_token) -> &mut Self {
                let $param_name: Option<$param_ty> = None;
                $($body)*
            }
        }
    };
    (
        $(#[$outer_doc:meta])*
        $vis:vis fn $fn_name:ident(mut $self_token:ident, $($param_name:ident: $param_ty:ty),+ $(,)?) -> Self {
            $($body:tt)*
        }
    ) => {
        $crate::__private::paste! {
            $(#[$outer_doc])*
            #[must_use]
            $vis fn [<with_ $fn_name>](mut $self_token, $($param_name: $param_ty),+) -> Self {
                $($body)*
            }

            $(#[$outer_doc])*
            $vis fn [<set_ $fn_name>](&mut $self_token, $($param_name: $param_ty),+) -> &mut Self {
                $($body)*
            }
        }
    };
}

pub use crate::__generate_set_and_with as generate_set_and_with;
