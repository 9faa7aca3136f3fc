use serde::{Serialize, Deserialize, Serializer, Deserializer};
use num_complex::Complex64;

/// Serializes Complex64 as [real, imag] array
pub fn serialize_complex<S>(complex: &Complex64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    [complex.re, complex.im].serialize(serializer)
}

/// Deserializes Complex64 from [real, imag] array
pub fn deserialize_complex<'de, D>(deserializer: D) -> Result<Complex64, D::Error>
where
    D: Deserializer<'de>,
{
    let [re, im]: [f64; 2] = Deserialize::deserialize(deserializer)?;
    Ok(Complex64::new(re, im))
}

/// Serializes a slice of Complex64 as a list of [real, imag] arrays
pub fn serialize_complex_vec<S>(values: &[Complex64], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let pairs: Vec<[f64; 2]> = values.iter().map(|c| [c.re, c.im]).collect();
    pairs.serialize(serializer)
}

/// Deserializes a list of [real, imag] arrays into Complex64 values
pub fn deserialize_complex_vec<'de, D>(deserializer: D) -> Result<Vec<Complex64>, D::Error>
where
    D: Deserializer<'de>,
{
    let pairs: Vec<[f64; 2]> = Deserialize::deserialize(deserializer)?;
    Ok(pairs.into_iter().map(|[re, im]| Complex64::new(re, im)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json;

    #[test]
    fn test_complex_serialization() {
        #[derive(Serialize, Deserialize)]
        struct Test {
            #[serde(serialize_with = "serialize_complex")]
            #[serde(deserialize_with = "deserialize_complex")]
            complex: Complex64,
        }

        let original = Test {
            complex: Complex64::new(1.0, 2.0),
        };

        let serialized = serde_json::to_string(&original).unwrap();
        assert_eq!(serialized, r#"{"complex":[1.0,2.0]}"#);
        let deserialized: Test = serde_json::from_str(&serialized).unwrap();

        assert_eq!(original.complex, deserialized.complex);
    }

    #[test]
    fn test_complex_vec_layout() {
        #[derive(Serialize, Deserialize)]
        struct Test {
            #[serde(serialize_with = "serialize_complex_vec")]
            #[serde(deserialize_with = "deserialize_complex_vec")]
            values: Vec<Complex64>,
        }

        let parsed: Test = serde_json::from_str(r#"{"values":[[0.0,0.0],[-2.0,0.5]]}"#).unwrap();
        assert_eq!(parsed.values, vec![Complex64::new(0.0, 0.0), Complex64::new(-2.0, 0.5)]);
    }
}
