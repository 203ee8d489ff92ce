/// Fixed-decimal rendering without a "-0.00"
pub fn format_num(x: f64, k: usize) -> String {
    if x.is_nan() {
        return "NA".to_string();
    }
    let s = format!("{:.*}", k, x);
    if s.starts_with('-') && s[1..].chars().all(|c| c == '0' || c == '.') {
        s[1..].to_string()
    } else {
        s
    }
}

/// p-value with its relation sign: `= 0.042` or `< 0.001`
pub fn format_p(p: f64, k: usize) -> String {
    if p.is_nan() {
        return "= NA".to_string();
    }
    if p < 0.001 {
        "< 0.001".to_string()
    } else {
        format!("= {}", format_num(p, k.max(3)))
    }
}

/// Confidence level as it appears in `CI95%`
pub fn format_conf_level(conf_level: f64) -> String {
    let pct = conf_level * 100.0;
    if (pct - pct.round()).abs() < 1e-9 {
        format!("{}", pct.round() as i64)
    } else {
        format_num(pct, 1)
    }
}

pub fn significance_stars(p: f64) -> &'static str {
    if p.is_nan() {
        "NA"
    } else if p < 0.001 {
        "***"
    } else if p < 0.01 {
        "**"
    } else if p < 0.05 {
        "*"
    } else {
        "ns"
    }
}
