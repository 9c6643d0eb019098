// MIT License - Copyright (c) 2026 Peter Wright
// Schema macros: one declaration yields the struct and both codec directions

/// Declare a record and derive its [`Wire`](crate::codec::Wire) impl from the
/// field list.
///
/// ```ignore
/// wire_struct! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct ZdoSimpleDescRsp {
///         pub src_addr: String [hex 2],
///         pub status: Status,
///         pub in_cluster_list: Vec<u16> [size 1],
///         bits(u8) {
///             pub logical_type: LogicalType = 0b0000_0011,
///             pub user_descriptor_available: bool = 0b0001_0000,
///         },
///     }
/// }
/// ```
///
/// Every field, including the last one, ends with a comma. A `bits` group is
/// one syntactic unit, so a span can never be interleaved with other fields;
/// zero, oversized and overlapping masks are rejected at compile time.
#[macro_export]
macro_rules! wire_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($body:tt)*
        }
    ) => {
        $crate::wire_struct! {
            @parse [$(#[$meta])*] [$vis] $name
            fields []
            names []
            steps []
            rest [$($body)*]
        }
    };

    // bitmask span
    (
        @parse $attrs:tt $vis:tt $name:ident
        fields [$($fields:tt)*]
        names [$($names:ident)*]
        steps [$($steps:tt)*]
        rest [
            bits($carrier:ident) {
                $( $(#[$fmeta:meta])* $fvis:vis $fname:ident : $fty:ty = $mask:expr ),+ $(,)?
            },
            $($rest:tt)*
        ]
    ) => {
        $crate::wire_struct! {
            @parse $attrs $vis $name
            fields [$($fields)* $( $(#[$fmeta])* $fvis $fname : $fty, )+]
            names [$($names)* $($fname)+]
            steps [$($steps)* (bits $carrier { $($fname : $fty = $mask),+ })]
            rest [$($rest)*]
        }
    };

    // plain or annotated field
    (
        @parse $attrs:tt $vis:tt $name:ident
        fields [$($fields:tt)*]
        names [$($names:ident)*]
        steps [$($steps:tt)*]
        rest [
            $(#[$fmeta:meta])* $fvis:vis $fname:ident : $fty:ty $([ $($ann:tt)* ])? ,
            $($rest:tt)*
        ]
    ) => {
        $crate::wire_struct! {
            @parse $attrs $vis $name
            fields [$($fields)* $(#[$fmeta])* $fvis $fname : $fty,]
            names [$($names)* $fname]
            steps [$($steps)* (field $fname : $fty [$($($ann)*)?])]
            rest [$($rest)*]
        }
    };

    (
        @parse [$($attrs:tt)*] [$($vis:tt)*] $name:ident
        fields [$($fields:tt)*]
        names [$($names:ident)*]
        steps [$($steps:tt)*]
        rest []
    ) => {
        $($attrs)*
        $($vis)* struct $name {
            $($fields)*
        }

        impl $crate::codec::Wire for $name {
            #[allow(unused_variables)]
            fn encode(
                &self,
                enc: &mut $crate::codec::Encoder,
            ) -> ::std::result::Result<(), $crate::codec::CodecError> {
                let Self { $($names),* } = self;
                $( $crate::wire_struct!(@encode enc $steps); )*
                Ok(())
            }

            #[allow(unused_variables)]
            fn decode(
                dec: &mut $crate::codec::Decoder<'_>,
            ) -> ::std::result::Result<Self, $crate::codec::CodecError> {
                $( $crate::wire_struct!(@decode dec $steps); )*
                Ok(Self { $($names),* })
            }
        }
    };

    // ---- encode steps ----

    (@encode $enc:ident (bits $carrier:ident { $($f:ident : $t:ty = $mask:expr),+ })) => {
        const _: () = {
            $( assert!(($mask as u64) != 0, "empty bitmask"); )+
            $( assert!(($mask as u64) <= (<$carrier>::MAX as u64), "bitmask wider than its carrier"); )+
            assert!(
                (0u64 $(| ($mask as u64))+).count_ones() == (0u32 $(+ ($mask as u64).count_ones())+),
                "overlapping bitmask fields"
            );
        };
        let offset = $enc.len();
        let mut carrier: u64 = 0;
        $(
            carrier = $crate::codec::merge_bits(
                carrier,
                $mask as u64,
                $crate::codec::BitField::to_bits($f),
            );
        )+
        $crate::codec::Wire::encode(&(carrier as $carrier), $enc)
            .map_err(|e| e.in_field(stringify!($($f)|+), offset))?;
    };

    (@encode $enc:ident (field $f:ident : $t:ty [transient])) => {};

    (@encode $enc:ident (field $f:ident : $t:ty [when ($($cond:tt)*) $($ann:tt)*])) => {
        if $crate::wire_struct!(@cond $($cond)*) {
            let offset = $enc.len();
            match $f {
                ::std::option::Option::Some(value) => {
                    $crate::wire_struct!(@enc_value $enc value [$($ann)*])
                }
                ::std::option::Option::None => Err($crate::codec::CodecError::MissingField),
            }
            .map_err(|e| e.in_field(stringify!($f), offset))?;
        }
    };

    (@encode $enc:ident (field $f:ident : $t:ty [$($ann:tt)*])) => {
        let offset = $enc.len();
        $crate::wire_struct!(@enc_value $enc $f [$($ann)*])
            .map_err(|e| e.in_field(stringify!($f), offset))?;
    };

    // ---- decode steps ----

    (@decode $dec:ident (bits $carrier:ident { $($f:ident : $t:ty = $mask:expr),+ })) => {
        let offset = $dec.position();
        let carrier = <$carrier as $crate::codec::Wire>::decode($dec)
            .map_err(|e| e.in_field(stringify!($($f)|+), offset))? as u64;
        $(
            let $f: $t = <$t as $crate::codec::BitField>::from_bits(
                $crate::codec::extract_bits(carrier, $mask as u64),
            )
            .map_err(|e| e.in_field(stringify!($f), offset))?;
        )+
    };

    (@decode $dec:ident (field $f:ident : $t:ty [transient])) => {
        let $f: $t = ::std::default::Default::default();
    };

    (@decode $dec:ident (field $f:ident : $t:ty [when ($($cond:tt)*) $($ann:tt)*])) => {
        let $f: $t = if $crate::wire_struct!(@cond $($cond)*) {
            let offset = $dec.position();
            ::std::option::Option::Some(
                $crate::wire_struct!(@dec_value $dec [$($ann)*])
                    .map_err(|e| e.in_field(stringify!($f), offset))?,
            )
        } else {
            ::std::option::Option::None
        };
    };

    (@decode $dec:ident (field $f:ident : $t:ty [$($ann:tt)*])) => {
        let offset = $dec.position();
        let $f: $t = $crate::wire_struct!(@dec_value $dec [$($ann)*])
            .map_err(|e| e.in_field(stringify!($f), offset))?;
    };

    // ---- value codecs ----

    (@enc_value $enc:ident $v:ident []) => {
        $crate::codec::Wire::encode($v, $enc)
    };
    (@enc_value $enc:ident $v:ident [be]) => {
        $crate::codec::encode_be($enc, $v)
    };
    (@enc_value $enc:ident $v:ident [bound $w:literal]) => {
        $crate::codec::encode_bounded($enc, $w, $v, false)
    };
    (@enc_value $enc:ident $v:ident [bound $w:literal, be]) => {
        $crate::codec::encode_bounded($enc, $w, $v, true)
    };
    (@enc_value $enc:ident $v:ident [hex $w:literal]) => {
        $crate::codec::hex::encode_str($enc, $w, $v)
    };
    (@enc_value $enc:ident $v:ident [size $s:literal]) => {
        $crate::codec::encode_prefixed($enc, $s, $v)
    };
    (@enc_value $enc:ident $v:ident [size $s:literal, hex $w:literal]) => {
        $crate::codec::hex::encode_list($enc, $s, $w, $v)
    };

    (@dec_value $dec:ident []) => {
        $crate::codec::Wire::decode($dec)
    };
    (@dec_value $dec:ident [be]) => {
        $crate::codec::decode_be($dec)
    };
    (@dec_value $dec:ident [bound $w:literal]) => {
        $crate::codec::decode_bounded($dec, $w, false)
    };
    (@dec_value $dec:ident [bound $w:literal, be]) => {
        $crate::codec::decode_bounded($dec, $w, true)
    };
    (@dec_value $dec:ident [hex $w:literal]) => {
        $crate::codec::hex::decode_str($dec, $w)
    };
    (@dec_value $dec:ident [size $s:literal]) => {
        $crate::codec::decode_prefixed($dec, $s)
    };
    (@dec_value $dec:ident [size $s:literal, hex $w:literal]) => {
        $crate::codec::hex::decode_list($dec, $s, $w)
    };

    // `a == 1`, `a.b != 2`, joined with `;` as a conjunction
    (@cond) => {
        true
    };
    (@cond $($path:ident).+ == $value:literal $(; $($rest:tt)*)?) => {
        ({
            use $crate::codec::CondValue as _;
            matches!(($($path).+).cond_value(), Some(x) if x == ($value as u64))
        } && $crate::wire_struct!(@cond $($($rest)*)?))
    };
    (@cond $($path:ident).+ != $value:literal $(; $($rest:tt)*)?) => {
        ({
            use $crate::codec::CondValue as _;
            matches!(($($path).+).cond_value(), Some(x) if x != ($value as u64))
        } && $crate::wire_struct!(@cond $($($rest)*)?))
    };
}

/// Declare a closed enum with a fixed numeric representation.
///
/// Decoding an unlisted value yields
/// [`CodecError::UnsupportedVariant`](crate::codec::CodecError::UnsupportedVariant).
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $repr:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $value:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        #[repr($repr)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant = $value ),+
        }

        impl $name {
            /// Variant name as declared.
            #[allow(dead_code)]
            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$variant => stringify!($variant), )+
                }
            }
        }

        impl ::std::convert::TryFrom<$repr> for $name {
            type Error = $crate::codec::CodecError;

            fn try_from(value: $repr) -> ::std::result::Result<Self, $crate::codec::CodecError> {
                $(
                    if value == ($value as $repr) {
                        return Ok(Self::$variant);
                    }
                )+
                Err($crate::codec::CodecError::UnsupportedVariant {
                    kind: stringify!($name),
                    value: value as u64,
                })
            }
        }

        impl ::std::convert::From<$name> for $repr {
            fn from(value: $name) -> $repr {
                value as $repr
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl $crate::codec::Wire for $name {
            fn encode(&self, enc: &mut $crate::codec::Encoder) -> $crate::codec::CodecResult<()> {
                $crate::codec::Wire::encode(&(*self as $repr), enc)
            }

            fn decode(dec: &mut $crate::codec::Decoder<'_>) -> $crate::codec::CodecResult<Self> {
                let raw = <$repr as $crate::codec::Wire>::decode(dec)?;
                Self::try_from(raw)
            }
        }

        impl $crate::codec::BitField for $name {
            fn to_bits(&self) -> u64 {
                *self as $repr as u64
            }

            fn from_bits(bits: u64) -> $crate::codec::CodecResult<Self> {
                Self::try_from(bits as $repr)
            }
        }

        impl $crate::codec::CondValue for $name {
            fn cond_value(&self) -> ::std::option::Option<u64> {
                Some(*self as $repr as u64)
            }
        }
    };
}

/// Give `bitflags` types a wire representation of their raw bits. Unknown
/// bits are retained.
#[macro_export]
macro_rules! wire_bitflags {
    ($($name:ident : $repr:ident),+ $(,)?) => {
        $(
            impl $crate::codec::Wire for $name {
                fn encode(&self, enc: &mut $crate::codec::Encoder) -> $crate::codec::CodecResult<()> {
                    $crate::codec::Wire::encode(&self.bits(), enc)
                }

                fn decode(dec: &mut $crate::codec::Decoder<'_>) -> $crate::codec::CodecResult<Self> {
                    Ok(Self::from_bits_retain(<$repr as $crate::codec::Wire>::decode(dec)?))
                }
            }

            impl $crate::codec::CondValue for $name {
                fn cond_value(&self) -> ::std::option::Option<u64> {
                    Some(self.bits() as u64)
                }
            }
        )+
    };
}
