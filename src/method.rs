//! Typed JSON RPC methods.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::borrow::Cow;

/// A JSON RPC method with typed parameters and result.
pub trait Method {
    type Params;
    type Result;

    fn name(&self) -> Cow<'static, str>;

    fn deserialize_params<'de, D>(deserializer: D) -> Result<Self::Params, D::Error>
    where
        D: Deserializer<'de>;
    fn serialize_params<S>(value: &Self::Params, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer;

    fn deserialize_result<'de, D>(deserializer: D) -> Result<Self::Result, D::Error>
    where
        D: Deserializer<'de>;
}

/// Methods named at runtime, with untyped parameters and results.
impl Method for String {
    type Params = Value;
    type Result = Value;

    fn name(&self) -> Cow<'static, str> {
        Cow::Owned(self.clone())
    }

    fn deserialize_params<'de, D>(deserializer: D) -> Result<Self::Params, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer)
    }

    fn serialize_params<S>(value: &Self::Params, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.serialize(serializer)
    }

    fn deserialize_result<'de, D>(deserializer: D) -> Result<Self::Result, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer)
    }
}

/// Dispatches to either a `serde(with = ...)` style module or the type's own
/// serde implementation.
#[doc(hidden)]
#[macro_export]
macro_rules! __method_serde {
    (deserialize, $ty:ty, [$($with:tt)*], $deserializer:expr) => {
        $($with)*::deserialize($deserializer)
    };
    (deserialize, $ty:ty, , $deserializer:expr) => {
        <$ty as ::serde::Deserialize>::deserialize($deserializer)
    };
    (serialize, $ty:ty, [$($with:tt)*], $value:expr, $serializer:expr) => {
        $($with)*::serialize($value, $serializer)
    };
    (serialize, $ty:ty, , $value:expr, $serializer:expr) => {
        <$ty as ::serde::Serialize>::serialize($value, $serializer)
    };
}

/// Declares a zero-sized type implementing [`Method`].
///
/// Parameters and results may be followed by a bracketed path to a module
/// with `serialize`/`deserialize` functions to use instead of the type's own
/// serde implementation.
#[macro_export]
macro_rules! method {
    (
        $(#[$attr:meta])*
        $pub:vis struct $type:ident as $name:literal
            $params:ty $([$($pwith:tt)*])? => $result:ty $([$($rwith:tt)*])?;
    ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Default)]
        $pub struct $type;

        impl ::std::fmt::Debug for $type {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                f.debug_tuple(stringify!($type))
                    .field(&$name)
                    .finish()
            }
        }

        impl $crate::method::Method for $type {
            type Params = $params;
            type Result = $result;

            fn name(&self) -> ::std::borrow::Cow<'static, str> {
                ::std::borrow::Cow::Borrowed($name)
            }

            fn deserialize_params<'de, D>(deserializer: D) -> Result<Self::Params, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                $crate::__method_serde!(deserialize, $params, $([$($pwith)*])?, deserializer)
            }

            fn serialize_params<S>(value: &Self::Params, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: ::serde::Serializer,
            {
                $crate::__method_serde!(serialize, $params, $([$($pwith)*])?, value, serializer)
            }

            fn deserialize_result<'de, D>(deserializer: D) -> Result<Self::Result, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                $crate::__method_serde!(deserialize, $result, $([$($rwith)*])?, deserializer)
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $type {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                let value =
                    <::std::borrow::Cow<str> as ::serde::Deserialize>::deserialize(deserializer)?;
                if value != $name {
                    return Err(::serde::de::Error::custom(format!(
                        "expected {:?} but got {:?}",
                        $name,
                        value,
                    )));
                }
                Ok(Self)
            }
        }

        impl ::serde::Serialize for $type {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: ::serde::Serializer,
            {
                serializer.serialize_str($name)
            }
        }
    };
}

/// Declares a namespace module of [`method!`] types.
#[macro_export]
macro_rules! module {
    (
        $(#[$attr:meta])*
        $pub:vis mod $mod:ident {
            $(
                $(#[$ma:meta])*
                $mv:vis struct $mt:ident as $mn:literal
                    $mp:ty $([$($mpp:tt)*])? => $mr:ty $([$($mrr:tt)*])?;
            )*
        }
    ) => {
        $(#[$attr])*
        $pub mod $mod {
            #[allow(unused_imports)]
            use super::*;

            $(
                $crate::method! {
                    $(#[$ma])* $mv struct $mt as $mn
                        $mp $([$($mpp)*])? => $mr $([$($mrr)*])?;
                }
            )*
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{eth, net, shh, types::Empty, web3};
    use serde_json::json;

    #[test]
    fn method_names() {
        assert_eq!(eth::BlockNumber.name(), "eth_blockNumber");
        assert_eq!(
            serde_json::to_value(web3::ClientVersion).unwrap(),
            json!("web3_clientVersion"),
        );
        assert!(serde_json::from_value::<eth::BlockNumber>(json!("eth_gasPrice")).is_err());
        assert_eq!("custom_method".to_owned().name(), "custom_method");
    }

    #[test]
    fn namespaces() {
        assert_eq!(eth::UninstallFilter.name(), "eth_uninstallFilter");
        assert_eq!(net::PeerCount.name(), "net_peerCount");
        assert_eq!(web3::Sha3.name(), "web3_sha3");
        assert_eq!(shh::Post.name(), "shh_post");
        assert_eq!(shh::GetMessages.name(), "shh_getMessages");
    }

    #[test]
    fn custom_serialization() {
        let code = eth::GetCode::deserialize_result(json!("0x6001")).unwrap();
        assert_eq!(code, [0x60, 0x01]);

        let params = eth::Accounts::serialize_params(&Empty, serde_json::value::Serializer);
        assert_eq!(params.unwrap(), json!([]));
    }
}
