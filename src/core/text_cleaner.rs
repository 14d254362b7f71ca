use once_cell::sync::Lazy;
use regex::Regex;

// 行首的數值（Ref X 欄位只有一欄數字）
static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([0-9]+(?:\.[0-9]+)?)").expect("valid regex"));

// OCR 常把負號讀成 '='
static LEADING_EQUALS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*=\s*").expect("valid regex"));

static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?[0-9]+\.[0-9]+").expect("valid regex"));

/// Number of header lines printed above the Ref Y values on the form.
const REF_Y_HEADER_LINES: usize = 2;

/// Ref X values are read in metres and reported in millimetres.
pub fn clean_ref_x(text: &str) -> Vec<String> {
    LEADING_NUMBER
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse::<f64>().ok())
        .map(|value| value * 1000.0)
        .filter(|value| value.is_finite())
        .map(format_scaled)
        .collect()
}

fn format_scaled(value: f64) -> String {
    let formatted = format!("{:.3}", value);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Ref Y values are signed decimals; whole numbers (`1.00`) are OCR noise
/// from the table ruling and are dropped.
pub fn clean_ref_y(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.trim().lines().collect();
    let data_lines = if lines.len() > REF_Y_HEADER_LINES {
        &lines[REF_Y_HEADER_LINES..]
    } else {
        &lines[..]
    };
    let joined = data_lines.join("\n");
    let signed = LEADING_EQUALS.replace_all(&joined, "-");

    DECIMAL
        .find_iter(&signed)
        .map(|m| m.as_str())
        .filter(|value| {
            value
                .split_once('.')
                .map(|(_, fraction)| fraction.chars().any(|c| c != '0'))
                .unwrap_or(false)
        })
        .map(str::to_string)
        .collect()
}

pub fn clean_text(text_x: &str, text_y: &str) -> (Vec<String>, Vec<String>) {
    let ref_x = clean_ref_x(text_x);
    let ref_y = clean_ref_y(text_y);

    tracing::debug!("Ref X: {}", ref_x.join(", "));
    tracing::debug!("Ref Y: {}", ref_y.join(", "));

    (ref_x, ref_y)
}
