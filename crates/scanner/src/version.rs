//! 버전 비교 — 에코시스템별 비교 의미론과 범위 표현식 평가
//!
//! 사전식(lexicographic) 비교는 버전에 대해 틀린 답을 내므로
//! (예: "2.9" > "2.10") 사용하지 않습니다. 에코시스템에 따라:
//!
//! - semver 계열 (npm, crates.io, Go, Hex, Pub, SwiftURL, CocoaPods):
//!   `semver` 크레이트 비교. 선행 "v", 빌드 메타데이터, 누락된
//!   minor/patch를 관용적으로 처리합니다.
//! - PEP 440 (PyPI): epoch, 릴리스 세그먼트, pre/post/dev 마커.
//! - 그 외 (Maven, NuGet, RubyGems, Packagist): 숫자 세그먼트는
//!   숫자로, 한정자(alpha, rc, ...)는 릴리스보다 앞 순서로 비교.
//!
//! 범위 표현식: 쉼표는 AND, 세미콜론은 OR 대안입니다.
//! 예: ">= 1.0.0, < 1.2.3; >= 2.0.0, < 2.0.5"
//!
//! 네이티브 문법으로 파싱되지 않는 버전은 세그먼트 단위 비교로
//! 폴백합니다 (여전히 숫자 인지 비교이며, 문자열 비교가 아님).

use std::cmp::Ordering;

use lockvet_core::types::Ecosystem;

/// 버전 비교 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionScheme {
    /// semver 비교
    Semver,
    /// PEP 440 비교
    Pep440,
    /// 세그먼트 단위 비교 (Maven 스타일 한정자 순서)
    Loose,
}

impl VersionScheme {
    /// 에코시스템의 네이티브 비교 방식
    pub fn for_ecosystem(ecosystem: Ecosystem) -> Self {
        match ecosystem {
            Ecosystem::Npm
            | Ecosystem::CratesIo
            | Ecosystem::Go
            | Ecosystem::Hex
            | Ecosystem::Pub
            | Ecosystem::SwiftUrl
            | Ecosystem::CocoaPods => Self::Semver,
            Ecosystem::PyPi => Self::Pep440,
            Ecosystem::Maven | Ecosystem::NuGet | Ecosystem::RubyGems | Ecosystem::Packagist => {
                Self::Loose
            }
        }
    }
}

/// 두 버전 문자열을 비교합니다.
pub fn compare(scheme: VersionScheme, a: &str, b: &str) -> Ordering {
    match scheme {
        VersionScheme::Semver => match (parse_semver(a), parse_semver(b)) {
            (Some(va), Some(vb)) => va.cmp(&vb),
            _ => loose_compare(a, b),
        },
        VersionScheme::Pep440 => match (parse_pep440(a), parse_pep440(b)) {
            (Some(va), Some(vb)) => va.cmp(&vb),
            _ => loose_compare(a, b),
        },
        VersionScheme::Loose => loose_compare(a, b),
    }
}

/// 버전이 범위 표현식을 만족하는지 평가합니다.
///
/// 세미콜론으로 구분된 대안 중 하나라도 만족하면 참이며,
/// 각 대안 안의 쉼표 구분 제약은 모두 만족해야 합니다.
/// 연산자 없는 항은 정확히 그 버전을 의미하고, "*"는 모든 버전입니다.
pub fn satisfies(scheme: VersionScheme, version: &str, expr: &str) -> bool {
    expr.split(';').any(|alternative| {
        let alternative = alternative.trim();
        !alternative.is_empty()
            && alternative
                .split(',')
                .all(|constraint| constraint_holds(scheme, version, constraint))
    })
}

fn constraint_holds(scheme: VersionScheme, version: &str, constraint: &str) -> bool {
    let constraint = constraint.trim();
    if constraint.is_empty() || constraint == "*" {
        return true;
    }

    let (op, operand) = split_operator(constraint);
    let operand = operand.trim();
    if operand.is_empty() {
        return false;
    }

    if op == "~=" {
        return compatible_release(scheme, version, operand);
    }

    let ord = compare(scheme, version, operand);
    match op {
        ">=" => ord != Ordering::Less,
        "<=" => ord != Ordering::Greater,
        ">" => ord == Ordering::Greater,
        "<" => ord == Ordering::Less,
        "!=" => ord != Ordering::Equal,
        "==" | "=" | "" => ord == Ordering::Equal,
        _ => false,
    }
}

fn split_operator(constraint: &str) -> (&str, &str) {
    for op in [">=", "<=", "==", "!=", "~=", ">", "<", "="] {
        if let Some(rest) = constraint.strip_prefix(op) {
            return (op, rest);
        }
    }
    ("", constraint)
}

/// PEP 440 `~=` (compatible release): `~= 2.2.3`은 `>= 2.2.3, < 2.3`과 같습니다.
fn compatible_release(scheme: VersionScheme, version: &str, operand: &str) -> bool {
    if compare(scheme, version, operand) == Ordering::Less {
        return false;
    }
    let segments: Vec<&str> = operand.split('.').collect();
    if segments.len() < 2 {
        return true;
    }
    let prefix = &segments[..segments.len() - 1];
    let Ok(last) = prefix[prefix.len() - 1].parse::<u64>() else {
        return true;
    };
    let mut upper: Vec<String> = prefix[..prefix.len() - 1]
        .iter()
        .map(|s| (*s).to_owned())
        .collect();
    upper.push((last + 1).to_string());
    compare(scheme, version, &upper.join(".")) == Ordering::Less
}

// --- semver ---

/// 관용적 semver 파싱
///
/// 선행 "v"/"V" 제거, 빌드 메타데이터("+...") 무시, 누락된
/// minor/patch는 0으로 채웁니다 (예: "1.4" -> "1.4.0").
fn parse_semver(s: &str) -> Option<semver::Version> {
    let s = s.trim().trim_start_matches(['v', 'V']);
    let s = s.split('+').next()?;
    let (core, pre) = match s.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (s, None),
    };

    let mut numbers = Vec::with_capacity(3);
    for part in core.split('.') {
        numbers.push(part.parse::<u64>().ok()?);
    }
    if numbers.is_empty() || numbers.len() > 3 {
        return None;
    }
    while numbers.len() < 3 {
        numbers.push(0);
    }

    let rebuilt = match pre {
        Some(pre) => format!("{}.{}.{}-{pre}", numbers[0], numbers[1], numbers[2]),
        None => format!("{}.{}.{}", numbers[0], numbers[1], numbers[2]),
    };
    semver::Version::parse(&rebuilt).ok()
}

// --- PEP 440 ---

/// PEP 440 버전 키
///
/// phase 순서: dev(-4) < alpha(-3) < beta(-2) < rc(-1) < final(0) < post(1)
#[derive(Debug, PartialEq, Eq)]
struct Pep440 {
    epoch: u64,
    release: Vec<u64>,
    phase: i64,
    phase_num: u64,
}

impl Ord for Pep440 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| compare_release(&self.release, &other.release))
            .then_with(|| self.phase.cmp(&other.phase))
            .then_with(|| self.phase_num.cmp(&other.phase_num))
    }
}

impl PartialOrd for Pep440 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn compare_release(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let va = a.get(i).copied().unwrap_or(0);
        let vb = b.get(i).copied().unwrap_or(0);
        match va.cmp(&vb) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

fn pep440_phase(marker: &str) -> Option<i64> {
    match marker {
        "dev" => Some(-4),
        "a" | "alpha" => Some(-3),
        "b" | "beta" => Some(-2),
        "c" | "rc" | "pre" | "preview" => Some(-1),
        "post" | "rev" | "r" => Some(1),
        _ => None,
    }
}

fn parse_pep440(s: &str) -> Option<Pep440> {
    let s = s.trim().to_lowercase();
    let s = s.trim_start_matches('v');
    let s = s.split('+').next()?;

    let (epoch, rest) = match s.split_once('!') {
        Some((e, rest)) => (e.parse::<u64>().ok()?, rest),
        None => (0, s),
    };

    let normalized = rest.replace(['-', '_'], ".");
    let mut release = Vec::new();
    let mut phase = 0i64;
    let mut phase_num = 0u64;
    let mut in_release = true;

    let mut tokens = normalized.split('.').peekable();
    while let Some(token) = tokens.next() {
        if token.is_empty() {
            return None;
        }
        if in_release && token.chars().all(|c| c.is_ascii_digit()) {
            release.push(token.parse().ok()?);
            continue;
        }
        // "3a1"처럼 릴리스 세그먼트에 붙은 마커 분리
        let digits: String = token.chars().take_while(char::is_ascii_digit).collect();
        let rest = &token[digits.len()..];
        if in_release && !digits.is_empty() {
            release.push(digits.parse().ok()?);
        }
        in_release = false;

        let marker: String = rest.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
        let number = &rest[marker.len()..];
        phase = pep440_phase(&marker)?;
        phase_num = if !number.is_empty() {
            number.parse().ok()?
        } else if let Some(next) = tokens.peek()
            && !next.is_empty()
            && next.chars().all(|c| c.is_ascii_digit())
        {
            // "alpha.2"처럼 마커와 번호가 분리된 형태
            next.parse().ok()?
        } else {
            0
        };
        // 첫 마커 이후는 무시 (예: post의 dev 조합은 드묾)
        break;
    }

    if release.is_empty() {
        return None;
    }
    Some(Pep440 {
        epoch,
        release,
        phase,
        phase_num,
    })
}

// --- 세그먼트 단위 폴백 비교 ---

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Num(u64),
    Qual(i64, String),
}

fn qualifier_rank(q: &str) -> i64 {
    match q {
        "dev" | "snapshot" => -1,
        "rc" | "cr" | "pre" | "preview" => -2,
        "m" | "milestone" => -3,
        "b" | "beta" => -4,
        "a" | "alpha" => -5,
        "" | "ga" | "final" | "release" => 0,
        "sp" | "post" => 1,
        _ => 2,
    }
}

fn loose_tokens(s: &str) -> Vec<Token> {
    let lower = s.trim().to_lowercase();
    let mut tokens = Vec::new();
    for piece in lower.split(['.', '-', '_', '+']) {
        if piece.is_empty() {
            continue;
        }
        if piece.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(n) = piece.parse() {
                tokens.push(Token::Num(n));
            }
            continue;
        }
        // "rc1" / "1rc" 같은 혼합 조각 분해
        let mut current = String::new();
        let mut is_digit = piece.chars().next().is_some_and(|c| c.is_ascii_digit());
        for c in piece.chars() {
            if c.is_ascii_digit() != is_digit {
                push_piece(&mut tokens, &current, is_digit);
                current.clear();
                is_digit = !is_digit;
            }
            current.push(c);
        }
        push_piece(&mut tokens, &current, is_digit);
    }
    tokens
}

fn push_piece(tokens: &mut Vec<Token>, piece: &str, is_digit: bool) {
    if piece.is_empty() {
        return;
    }
    if is_digit {
        if let Ok(n) = piece.parse() {
            tokens.push(Token::Num(n));
        }
    } else {
        tokens.push(Token::Qual(qualifier_rank(piece), piece.to_owned()));
    }
}

/// 세그먼트 단위 비교
///
/// 숫자끼리는 숫자로, 한정자끼리는 순위로 비교하며, 짝이 없는
/// 세그먼트는 숫자면 0, 한정자면 빈 한정자(릴리스)로 간주합니다.
/// 그래서 "1.0-alpha" < "1.0" < "1.0.1"이 성립합니다.
fn loose_compare(a: &str, b: &str) -> Ordering {
    let ta = loose_tokens(a);
    let tb = loose_tokens(b);
    let len = ta.len().max(tb.len());

    for i in 0..len {
        let ord = match (ta.get(i), tb.get(i)) {
            (Some(Token::Num(x)), Some(Token::Num(y))) => x.cmp(y),
            (Some(Token::Qual(rx, sx)), Some(Token::Qual(ry, sy))) => {
                rx.cmp(ry).then_with(|| sx.cmp(sy))
            }
            // 숫자는 한정자보다 뒤 (1.0.1 > 1.0-rc)
            (Some(Token::Num(_)), Some(Token::Qual(..))) => Ordering::Greater,
            (Some(Token::Qual(..)), Some(Token::Num(_))) => Ordering::Less,
            (Some(Token::Num(x)), None) => x.cmp(&0),
            (None, Some(Token::Num(y))) => 0u64.cmp(y),
            (Some(Token::Qual(rx, _)), None) => rx.cmp(&0),
            (None, Some(Token::Qual(ry, _))) => 0i64.cmp(ry),
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
