//! GraphQL scalar definitions.

use std::{fmt, marker::PhantomData, str::FromStr};

use juniper::{
    GraphQLType, InputValue, ParseScalarResult, ParseScalarValue, ScalarToken,
    ScalarValue, Value,
};

/// Strategy for `#[graphql(with = ..)]` attribute, representing a scalar as
/// the textual form of its `As` domain type.
///
/// Output is rendered with the [`Display`] impl of `As`, and input is parsed
/// with its [`FromStr`] impl, so `FAC-2024-0007` or `19.60` travel as plain
/// GraphQL strings without losing precision.
///
/// Target type must implement [`AsRef`] and [`TryFrom`] for `As` type.
///
/// [`Display`]: fmt::Display
#[derive(Debug)]
pub struct Via<As>(PhantomData<As>);

impl<As> Via<As> {
    /// Renders the provided `value` as a string scalar [`Value`].
    pub fn to_output<T, S>(value: &T) -> Value<S>
    where
        As: fmt::Display,
        T: AsRef<As>,
        S: ScalarValue,
    {
        Value::from(value.as_ref().to_string())
    }

    /// Parses the target type out of a string scalar [`InputValue`].
    ///
    /// # Errors
    ///
    /// If the `input` is not a string, or it doesn't parse into `As`, or the
    /// parsed `As` is rejected by the target type.
    pub fn from_input<T, S>(input: &InputValue<S>) -> Result<T, String>
    where
        As: FromStr,
        As::Err: fmt::Display,
        T: TryFrom<As> + GraphQLType<S, TypeInfo = ()>,
        T::Error: fmt::Display,
        S: ScalarValue,
    {
        let name = T::name(&()).unwrap_or("scalar");

        let s = input.as_string_value().ok_or_else(|| {
            format!("Cannot parse `{name}` input scalar from {input}")
        })?;
        s.parse::<As>()
            .map_err(|e| format!("Cannot parse `{name}` from \"{s}\": {e}"))?
            .try_into()
            .map_err(|e| format!("Invalid `{name}` input scalar: {e}"))
    }

    /// Parses the provided [`ScalarToken`] as a string.
    ///
    /// # Errors
    ///
    /// If the token is not a string.
    pub fn parse_token<S: ScalarValue>(
        value: ScalarToken<'_>,
    ) -> ParseScalarResult<S> {
        <String as ParseScalarValue<S>>::from_str(value)
    }
}
