use axum::http;
use headers::{Header, HeaderName, HeaderValue};
use mime::Mime;

/// `Accept` header, media ranges ordered by descending `q` (ties keep request order).
/// Ranges with `q=0` are dropped.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Accept(pub Vec<Mime>);

// q-values have at most three decimals, so thousandths keep the ordering exact
fn quality(mime: &Mime) -> u16 {
    mime.get_param("q")
        .and_then(|q| q.as_str().parse::<f32>().ok())
        .map(|q| (q.clamp(0.0, 1.0) * 1000.0).round() as u16)
        .unwrap_or(1000)
}

impl Accept {
    /// First media range, in preference order, that `convert` accepts.
    pub fn negotiate<T>(&self, convert: impl Fn(&Mime) -> Option<T>) -> Option<T> {
        self.0.iter().find_map(convert)
    }
}

impl Header for Accept {
    fn name() -> &'static HeaderName {
        &http::header::ACCEPT
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let mut ranges = Vec::new();
        for value in values {
            let value = value.to_str().map_err(|_| headers::Error::invalid())?;
            for range in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let mime: Mime = range.parse().map_err(|_| headers::Error::invalid())?;
                let q = quality(&mime);
                if q > 0 {
                    ranges.push((q, mime));
                }
            }
        }

        if ranges.is_empty() {
            return Err(headers::Error::invalid());
        }

        // sort_by is stable
        ranges.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(Accept(ranges.into_iter().map(|(_, mime)| mime).collect()))
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        let joined = self
            .0
            .iter()
            .map(Mime::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        if let Ok(value) = HeaderValue::from_str(&joined) {
            values.extend(std::iter::once(value));
        }
    }
}
