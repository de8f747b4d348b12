//! pgvector text literals. Vectors cross the driver boundary as `[a,b,...]` strings and are
//! cast with `::text::vector` inside the statement.

pub fn vector_to_pg(vec: &[f32]) -> String {
	let mut out = String::with_capacity(vec.len() * 8 + 2);

	out.push('[');

	for (idx, value) in vec.iter().enumerate() {
		if idx > 0 {
			out.push(',');
		}

		out.push_str(&value.to_string());
	}

	out.push(']');

	out
}

/// A vector is writable when it has the expected dimension and only finite components.
pub fn is_writable(vec: &[f32], dim: u32) -> bool {
	vec.len() == dim as usize && vec.iter().all(|value| value.is_finite())
}
