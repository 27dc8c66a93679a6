//! Symbolic cost intermediate representation and its simplifier.
//!
//! The IR is a small closed set of tagged variants over which the
//! analyzer builds up costs and the simplifier performs canonicalization,
//! asymptotic comparison, and polynomial extraction. Values are
//! immutable; every simplification returns a new value.

use crate::rational::Rational;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Exponent of a `Pow` node: either a known rational power (`n^2`) or a
/// symbolic one (`a^n`, the exponential case used by recursion analysis).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Exponent {
    Rational { value: RationalView },
    Sym { name: String },
}

impl Exponent {
    pub fn r(value: Rational) -> Self {
        Exponent::Rational {
            value: RationalView::from(value),
        }
    }

    pub fn sym(name: impl Into<String>) -> Self {
        Exponent::Sym { name: name.into() }
    }

    pub fn as_rational(&self) -> Option<Rational> {
        match self {
            Exponent::Rational { value } => Some(value.into()),
            Exponent::Sym { .. } => None,
        }
    }
}

/// `serde`-friendly view of a [`Rational`] (numerator/denominator pair).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RationalView {
    pub numer: i64,
    pub denom: i64,
}

impl From<Rational> for RationalView {
    fn from(r: Rational) -> Self {
        RationalView {
            numer: r.numer(),
            denom: r.denom(),
        }
    }
}

impl From<&RationalView> for Rational {
    fn from(v: &RationalView) -> Self {
        Rational::new(v.numer, v.denom)
    }
}

/// The cost IR. A DAG-free symbolic value representing an element
/// count: the number of elementary steps a statement or program performs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Ir {
    K { value: RationalView },
    Sym { name: String },
    Sum { terms: Vec<Ir> },
    Prod { factors: Vec<Ir> },
    Pow { base: Box<Ir>, exponent: Exponent },
    Log { base: u64, arg: Box<Ir> },
    Max { alts: Vec<Ir> },
    Min { alts: Vec<Ir> },
    Piecewise { cases: Vec<(String, Ir)> },
}

impl Ir {
    pub fn k(r: Rational) -> Ir {
        Ir::K { value: r.into() }
    }

    pub fn zero() -> Ir {
        Ir::k(Rational::ZERO)
    }

    pub fn one() -> Ir {
        Ir::k(Rational::ONE)
    }

    pub fn int(n: i64) -> Ir {
        Ir::k(Rational::from_int(n))
    }

    pub fn sym(name: impl Into<String>) -> Ir {
        Ir::Sym { name: name.into() }
    }

    pub fn sum(terms: Vec<Ir>) -> Ir {
        Ir::Sum { terms }
    }

    pub fn prod(factors: Vec<Ir>) -> Ir {
        Ir::Prod { factors }
    }

    pub fn pow(base: Ir, exponent: Exponent) -> Ir {
        Ir::Pow {
            base: Box::new(base),
            exponent,
        }
    }

    pub fn log(base: u64, arg: Ir) -> Ir {
        Ir::Log {
            base,
            arg: Box::new(arg),
        }
    }

    pub fn max(alts: Vec<Ir>) -> Ir {
        Ir::Max { alts }
    }

    pub fn min(alts: Vec<Ir>) -> Ir {
        Ir::Min { alts }
    }

    pub fn is_zero_const(&self) -> bool {
        matches!(self, Ir::K { value } if value.numer == 0)
    }

    pub fn as_const(&self) -> Option<Rational> {
        match self {
            Ir::K { value } => Some(value.into()),
            _ => None,
        }
    }

    pub fn add(self, other: Ir) -> Ir {
        Ir::sum(vec![self, other])
    }

    pub fn mul(self, other: Ir) -> Ir {
        Ir::prod(vec![self, other])
    }
}

impl fmt::Display for Ir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", pretty_ascii(self))
    }
}

/// Bounds the total number of simplification rewrite steps performed
/// ("IR simplification steps ≤ 10,000"). When the budget is spent,
/// [`Simplifier::simplify`] stops rewriting and returns the best-effort
/// (possibly unsimplified) subtree instead of looping forever.
pub struct Simplifier {
    steps: usize,
    budget: usize,
}

impl Default for Simplifier {
    fn default() -> Self {
        Simplifier::new(10_000)
    }
}

impl Simplifier {
    pub fn new(budget: usize) -> Self {
        Self { steps: 0, budget }
    }

    pub fn exceeded(&self) -> bool {
        self.steps >= self.budget
    }

    fn tick(&mut self) -> bool {
        if self.steps >= self.budget {
            return false;
        }
        self.steps += 1;
        true
    }

    /// Canonicalize and simplify `ir` bottom-up.
    pub fn simplify(&mut self, ir: &Ir) -> Ir {
        if !self.tick() {
            return ir.clone();
        }
        match ir {
            Ir::K { .. } | Ir::Sym { .. } => ir.clone(),
            Ir::Sum { terms } => {
                let simplified: Vec<Ir> = terms.iter().map(|t| self.simplify(t)).collect();
                self.build_sum(simplified)
            }
            Ir::Prod { factors } => {
                let simplified: Vec<Ir> = factors.iter().map(|f| self.simplify(f)).collect();
                self.build_prod(simplified)
            }
            Ir::Pow { base, exponent } => {
                let base = self.simplify(base);
                self.build_pow(base, exponent.clone())
            }
            Ir::Log { base, arg } => {
                let arg = self.simplify(arg);
                self.build_log(*base, arg)
            }
            Ir::Max { alts } => {
                let simplified: Vec<Ir> = alts.iter().map(|a| self.simplify(a)).collect();
                self.build_max_min(simplified, true)
            }
            Ir::Min { alts } => {
                let simplified: Vec<Ir> = alts.iter().map(|a| self.simplify(a)).collect();
                self.build_max_min(simplified, false)
            }
            Ir::Piecewise { cases } => {
                let cases = cases
                    .iter()
                    .map(|(label, v)| (label.clone(), self.simplify(v)))
                    .collect();
                Ir::Piecewise { cases }
            }
        }
    }

    fn build_pow(&mut self, base: Ir, exponent: Exponent) -> Ir {
        if let Some(r) = exponent.as_rational() {
            if r.is_zero() {
                return Ir::one();
            }
            if r.is_one() {
                return base;
            }
            if let (Some(b), Some(n)) = (base.as_const(), r.as_i64()) {
                if n >= 0 && n <= 32 {
                    let mut acc = Rational::ONE;
                    for _ in 0..n {
                        acc = acc * b;
                    }
                    return Ir::k(acc);
                }
            }
        }
        Ir::pow(base, exponent)
    }

    fn build_log(&mut self, base: u64, arg: Ir) -> Ir {
        if let Some(r) = arg.as_const() {
            if r.is_one() {
                return Ir::zero();
            }
        }
        if let Ir::Pow {
            base: pbase,
            exponent,
        } = &arg
        {
            if let Some(pb) = pbase.as_const() {
                if pb.as_i64() == Some(base as i64) {
                    return match exponent {
                        Exponent::Rational { value } => Ir::k(value.into()),
                        Exponent::Sym { name } => Ir::sym(name.clone()),
                    };
                }
            }
        }
        Ir::log(base, arg)
    }

    fn build_max_min(&mut self, alts: Vec<Ir>, is_max: bool) -> Ir {
        let mut flat = Vec::new();
        for a in alts {
            match a {
                Ir::Max { alts: inner } if is_max => flat.extend(inner),
                Ir::Min { alts: inner } if !is_max => flat.extend(inner),
                other => flat.push(other),
            }
        }
        dedup_by_key(&mut flat, |t| pretty_ascii(t));
        if flat.len() == 1 {
            return flat.into_iter().next().unwrap();
        }
        // If every alternative is a constant, fold immediately.
        if let Some(consts) = flat
            .iter()
            .map(|t| t.as_const())
            .collect::<Option<Vec<_>>>()
        {
            let best = if is_max {
                consts.into_iter().max()
            } else {
                consts.into_iter().min()
            };
            if let Some(best) = best {
                return Ir::k(best);
            }
        }
        sort_terms(&mut flat);
        if is_max {
            Ir::max(flat)
        } else {
            Ir::min(flat)
        }
    }

    fn build_sum(&mut self, terms: Vec<Ir>) -> Ir {
        let mut flat = Vec::new();
        flatten_sum(terms, &mut flat);

        let mut groups: BTreeMap<String, (Rational, Ir)> = BTreeMap::new();
        for term in flat {
            let (coeff, rest) = extract_coeff(&term);
            if coeff.is_zero() {
                continue;
            }
            let key = pretty_ascii(&rest);
            groups
                .entry(key)
                .and_modify(|(c, _)| *c = *c + coeff)
                .or_insert((coeff, rest));
        }

        let mut result: Vec<Ir> = groups
            .into_values()
            .filter(|(c, _)| !c.is_zero())
            .map(|(c, rest)| rebuild_term(c, rest))
            .collect();

        if result.is_empty() {
            return Ir::zero();
        }
        sort_terms(&mut result);
        if result.len() == 1 {
            result.into_iter().next().unwrap()
        } else {
            Ir::sum(result)
        }
    }

    fn build_prod(&mut self, factors: Vec<Ir>) -> Ir {
        let mut flat = Vec::new();
        flatten_prod(factors, &mut flat);

        let mut coeff = Rational::ONE;
        let mut bases: BTreeMap<String, (Ir, Rational)> = BTreeMap::new();
        let mut non_power: Vec<Ir> = Vec::new();

        for f in flat {
            if let Some(r) = f.as_const() {
                coeff = coeff * r;
                continue;
            }
            if coeff.is_zero() {
                continue;
            }
            let (base, exp) = match &f {
                Ir::Pow {
                    base, exponent, ..
                } => {
                    if let Some(r) = exponent.as_rational() {
                        ((**base).clone(), r)
                    } else {
                        non_power.push(f);
                        continue;
                    }
                }
                other => (other.clone(), Rational::ONE),
            };
            let key = pretty_ascii(&base);
            bases
                .entry(key)
                .and_modify(|(_, e)| *e = *e + exp)
                .or_insert((base, exp));
        }

        if coeff.is_zero() {
            return Ir::zero();
        }

        let mut rebuilt: Vec<Ir> = Vec::new();
        for (_, (base, exp)) in bases {
            if exp.is_zero() {
                continue;
            }
            if exp.is_one() {
                rebuilt.push(base);
            } else {
                rebuilt.push(Ir::pow(base, Exponent::r(exp)));
            }
        }
        rebuilt.extend(non_power);
        sort_terms(&mut rebuilt);

        if rebuilt.is_empty() {
            Ir::k(coeff)
        } else if coeff.is_one() {
            if rebuilt.len() == 1 {
                rebuilt.into_iter().next().unwrap()
            } else {
                Ir::prod(rebuilt)
            }
        } else {
            let mut all = vec![Ir::k(coeff)];
            all.extend(rebuilt);
            Ir::prod(all)
        }
    }
}

fn rebuild_term(coeff: Rational, rest: Ir) -> Ir {
    if rest.as_const() == Some(Rational::ONE) {
        Ir::k(coeff)
    } else if coeff.is_one() {
        rest
    } else {
        Ir::prod(vec![Ir::k(coeff), rest])
    }
}

fn flatten_sum(terms: Vec<Ir>, out: &mut Vec<Ir>) {
    for t in terms {
        match t {
            Ir::Sum { terms: inner } => flatten_sum(inner, out),
            Ir::K { value } if value.numer == 0 => {}
            other => out.push(other),
        }
    }
}

fn flatten_prod(factors: Vec<Ir>, out: &mut Vec<Ir>) {
    for f in factors {
        match f {
            Ir::Prod { factors: inner } => flatten_prod(inner, out),
            other => out.push(other),
        }
    }
}

fn dedup_by_key<T, F: Fn(&T) -> String>(items: &mut Vec<T>, key: F) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(key(item)));
}

/// Split a term into `(coefficient, rest)` so that `term == coefficient * rest`,
/// with `rest` carrying no bare numeric factor of its own (used to collect
/// like terms in a `Sum`).
fn extract_coeff(ir: &Ir) -> (Rational, Ir) {
    match ir {
        Ir::K { value } => (value.into(), Ir::one()),
        Ir::Prod { factors } => {
            let mut coeff = Rational::ONE;
            let mut rest = Vec::new();
            for f in factors {
                if let Some(r) = f.as_const() {
                    coeff = coeff * r;
                } else {
                    rest.push(f.clone());
                }
            }
            sort_terms(&mut rest);
            let rest_ir = if rest.is_empty() {
                Ir::one()
            } else if rest.len() == 1 {
                rest.into_iter().next().unwrap()
            } else {
                Ir::prod(rest)
            };
            (coeff, rest_ir)
        }
        other => (Rational::ONE, other.clone()),
    }
}

/// Deterministic ordering used for canonicalization: by symbol rank, then
/// exponent descending, then lexicographic ("simplifier must be
/// deterministic").
fn sort_terms(terms: &mut [Ir]) {
    terms.sort_by(|a, b| cmp_order_key(a).cmp(&cmp_order_key(b)));
}

fn cmp_order_key(ir: &Ir) -> (i32, std::cmp::Reverse<i64>, String) {
    let profile = Profile::of(ir);
    let tier = if profile.exponential.is_some() {
        0
    } else if !profile.powers.is_empty() {
        1
    } else if !profile.log_powers.is_empty() {
        2
    } else {
        3
    };
    let degree_milli = profile.total_degree_milli();
    (tier, std::cmp::Reverse(degree_milli), pretty_ascii(ir))
}

/// Asymptotic comparison result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Less,
    Equal,
    Greater,
    Incomparable,
}

/// A monomial's dominance profile: which symbols it grows polynomially in,
/// whether it grows exponentially, and what log-power it carries.
#[derive(Debug, Clone, Default)]
struct Profile {
    exponential: Option<Rational>, // growth base, largest wins
    powers: BTreeMap<String, Rational>,
    log_powers: BTreeMap<String, Rational>,
}

impl Profile {
    fn total_degree_milli(&self) -> i64 {
        let poly: Rational = self
            .powers
            .values()
            .fold(Rational::ZERO, |acc, v| acc + *v);
        (poly.to_f64() * 1000.0).round() as i64
    }

    fn of(ir: &Ir) -> Profile {
        let mut p = Profile::default();
        accumulate_profile(ir, Rational::ONE, &mut p);
        p
    }

    fn dominant_log_symbol(&self) -> Option<(&String, Rational)> {
        self.log_powers
            .iter()
            .max_by(|a, b| a.1.cmp(b.1))
            .map(|(k, v)| (k, *v))
    }
}

fn accumulate_profile(ir: &Ir, exp_scale: Rational, p: &mut Profile) {
    match ir {
        Ir::K { .. } => {}
        Ir::Sym { name } => {
            *p.powers.entry(name.clone()).or_insert(Rational::ZERO) =
                *p.powers.get(name).unwrap_or(&Rational::ZERO) + exp_scale;
        }
        Ir::Prod { factors } => {
            for f in factors {
                accumulate_profile(f, exp_scale, p);
            }
        }
        Ir::Pow { base, exponent } => match exponent {
            Exponent::Rational { value } => {
                let r: Rational = value.into();
                accumulate_profile(base, exp_scale * r, p);
            }
            Exponent::Sym { .. } => {
                if let Some(b) = base.as_const() {
                    let existing = p.exponential.unwrap_or(Rational::ZERO);
                    if b > existing {
                        p.exponential = Some(b);
                    }
                } else if matches!(**base, Ir::Sym { .. }) {
                    // symbol-based exponential growth (e.g. phi^n): treat as
                    // dominant over any polynomial regardless of base value.
                    p.exponential = Some(p.exponential.unwrap_or(Rational::from_int(2)));
                }
            }
        },
        Ir::Log { base, arg } => {
            let sym = dominant_symbol_name(arg);
            if let Some(sym) = sym {
                let entry = p.log_powers.entry(sym).or_insert(Rational::ZERO);
                *entry = *entry + exp_scale;
            }
            let _ = base;
        }
        Ir::Sum { terms } => {
            // Dominance of a sum is governed by its dominant term.
            if let Some(t) = terms.iter().max_by(|a, b| match cmp(a, b) {
                Cmp::Less => Ordering::Less,
                Cmp::Greater => Ordering::Greater,
                _ => Ordering::Equal,
            }) {
                accumulate_profile(t, exp_scale, p);
            }
        }
        Ir::Max { alts } | Ir::Min { alts } => {
            if let Some(t) = alts.iter().max_by(|a, b| match cmp(a, b) {
                Cmp::Less => Ordering::Less,
                Cmp::Greater => Ordering::Greater,
                _ => Ordering::Equal,
            }) {
                accumulate_profile(t, exp_scale, p);
            }
        }
        Ir::Piecewise { cases } => {
            if let Some((_, v)) = cases.iter().max_by(|a, b| match cmp(&a.1, &b.1) {
                Cmp::Less => Ordering::Less,
                Cmp::Greater => Ordering::Greater,
                _ => Ordering::Equal,
            }) {
                accumulate_profile(v, exp_scale, p);
            }
        }
    }
}

fn dominant_symbol_name(ir: &Ir) -> Option<String> {
    let profile = Profile::of(ir);
    profile
        .powers
        .iter()
        .max_by(|a, b| a.1.cmp(b.1))
        .map(|(k, _)| k.clone())
}

/// Compare two IR values asymptotically.
pub fn cmp(a: &Ir, b: &Ir) -> Cmp {
    let pa = Profile::of(a);
    let pb = Profile::of(b);

    match (pa.exponential, pb.exponential) {
        (Some(ba), Some(bb)) => return rational_cmp_to(ba, bb),
        (Some(_), None) => return Cmp::Greater,
        (None, Some(_)) => return Cmp::Less,
        (None, None) => {}
    }

    if pa.powers != pb.powers {
        let symbols_a: std::collections::BTreeSet<_> = pa.powers.keys().collect();
        let symbols_b: std::collections::BTreeSet<_> = pb.powers.keys().collect();
        if symbols_a != symbols_b {
            return Cmp::Incomparable;
        }
        return pa.total_degree_milli().cmp(&pb.total_degree_milli()).into();
    }

    match (pa.dominant_log_symbol(), pb.dominant_log_symbol()) {
        (Some((sa, ea)), Some((sb, eb))) => {
            if sa != sb {
                return Cmp::Incomparable;
            }
            rational_cmp_to(ea, eb)
        }
        (Some(_), None) => Cmp::Greater,
        (None, Some(_)) => Cmp::Less,
        (None, None) => Cmp::Equal,
    }
}

fn rational_cmp_to(a: Rational, b: Rational) -> Cmp {
    match a.cmp(&b) {
        Ordering::Less => Cmp::Less,
        Ordering::Equal => Cmp::Equal,
        Ordering::Greater => Cmp::Greater,
    }
}

impl From<Ordering> for Cmp {
    fn from(o: Ordering) -> Self {
        match o {
            Ordering::Less => Cmp::Less,
            Ordering::Equal => Cmp::Equal,
            Ordering::Greater => Cmp::Greater,
        }
    }
}

/// Extract the unique dominant term of a (simplified) sum, or a canonical
/// sum of co-dominant terms if several tie under [`cmp`].
pub fn dominant_term(ir: &Ir) -> Ir {
    let terms: Vec<Ir> = match ir {
        Ir::Sum { terms } => terms.clone(),
        other => vec![other.clone()],
    };
    if terms.is_empty() {
        return Ir::zero();
    }
    let mut best = vec![terms[0].clone()];
    for t in &terms[1..] {
        match cmp(t, &best[0]) {
            Cmp::Greater => best = vec![t.clone()],
            Cmp::Equal => best.push(t.clone()),
            _ => {}
        }
    }
    if best.len() == 1 {
        best.into_iter().next().unwrap()
    } else {
        Ir::sum(best)
    }
}

/// A polynomial-with-rational-coefficients form of an IR value in a single
/// symbol, used to compute [`crate::analyzer::iterative::StrongBounds`].
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialForm {
    /// `coefficients[i]` is the coefficient of `symbol^i`, index 0 is the
    /// constant term.
    pub coefficients: Vec<Rational>,
    pub dominant_degree: usize,
}

impl PolynomialForm {
    pub fn formula(&self, symbol: &str) -> String {
        let mut parts = Vec::new();
        for (degree, coeff) in self.coefficients.iter().enumerate().rev() {
            if coeff.is_zero() {
                continue;
            }
            let term = match degree {
                0 => format!("{}", coeff),
                1 if coeff.is_one() => symbol.to_string(),
                1 => format!("{}*{}", coeff, symbol),
                d if coeff.is_one() => format!("{}^{}", symbol, d),
                d => format!("{}*{}^{}", coeff, symbol, d),
            };
            parts.push(term);
        }
        if parts.is_empty() {
            "0".to_string()
        } else {
            parts.join(" + ")
        }
    }

    pub fn dominant_term_ir(&self, symbol: &str) -> Ir {
        let coeff = self.coefficients[self.dominant_degree];
        if self.dominant_degree == 0 {
            Ir::k(coeff)
        } else {
            let pow = Ir::pow(Ir::sym(symbol), Exponent::r(Rational::from_int(self.dominant_degree as i64)));
            if coeff.is_one() {
                pow
            } else {
                Ir::prod(vec![Ir::k(coeff), pow])
            }
        }
    }

    pub fn constant_term(&self) -> Rational {
        self.coefficients[0]
    }
}

/// Attempt to view a simplified IR value as a polynomial in `symbol` with
/// rational coefficients. Returns `None` if any term depends on another
/// symbol, a logarithm, or an exponential.
pub fn polynomial_form(ir: &Ir, symbol: &str) -> Option<PolynomialForm> {
    let terms: Vec<Ir> = match ir {
        Ir::Sum { terms } => terms.clone(),
        other => vec![other.clone()],
    };

    let mut degree_coeffs: BTreeMap<usize, Rational> = BTreeMap::new();
    for term in &terms {
        let (coeff, degree) = term_as_power_of(term, symbol)?;
        *degree_coeffs.entry(degree).or_insert(Rational::ZERO) =
            *degree_coeffs.get(&degree).unwrap_or(&Rational::ZERO) + coeff;
    }

    let max_degree = degree_coeffs.keys().copied().max().unwrap_or(0);
    let mut coefficients = vec![Rational::ZERO; max_degree + 1];
    for (d, c) in degree_coeffs {
        coefficients[d] = c;
    }
    let dominant_degree = coefficients
        .iter()
        .enumerate()
        .rev()
        .find(|(_, c)| !c.is_zero())
        .map(|(d, _)| d)
        .unwrap_or(0);

    Some(PolynomialForm {
        coefficients,
        dominant_degree,
    })
}

fn term_as_power_of(term: &Ir, symbol: &str) -> Option<(Rational, usize)> {
    match term {
        Ir::K { value } => Some((value.into(), 0)),
        Ir::Sym { name } if name == symbol => Some((Rational::ONE, 1)),
        Ir::Pow { base, exponent } => {
            if let Ir::Sym { name } = base.as_ref() {
                if name == symbol {
                    let r = exponent.as_rational()?;
                    let n = r.as_i64()?;
                    if n < 0 {
                        return None;
                    }
                    return Some((Rational::ONE, n as usize));
                }
            }
            None
        }
        Ir::Prod { factors } => {
            let mut coeff = Rational::ONE;
            let mut degree = 0usize;
            for f in factors {
                match f {
                    Ir::K { value } => coeff = coeff * Rational::from(value),
                    Ir::Sym { name } if name == symbol => degree += 1,
                    Ir::Pow { base, exponent } if matches!(base.as_ref(), Ir::Sym { name } if name == symbol) =>
                    {
                        let r = exponent.as_rational()?;
                        let n = r.as_i64()?;
                        if n < 0 {
                            return None;
                        }
                        degree += n as usize;
                    }
                    _ => return None,
                }
            }
            Some((coeff, degree))
        }
        _ => None,
    }
}

/// ASCII pretty-printer, e.g. `n*log(n)`, `n^2`, `2*n + 3`.
pub fn pretty_ascii(ir: &Ir) -> String {
    match ir {
        Ir::K { value } => {
            let r: Rational = value.into();
            format!("{}", r)
        }
        Ir::Sym { name } => name.clone(),
        Ir::Sum { terms } => {
            if terms.is_empty() {
                "0".to_string()
            } else {
                terms
                    .iter()
                    .map(pretty_ascii)
                    .collect::<Vec<_>>()
                    .join(" + ")
            }
        }
        Ir::Prod { factors } => {
            if factors.is_empty() {
                "1".to_string()
            } else {
                factors
                    .iter()
                    .map(|f| match f {
                        Ir::Sum { .. } => format!("({})", pretty_ascii(f)),
                        other => pretty_ascii(other),
                    })
                    .collect::<Vec<_>>()
                    .join("*")
            }
        }
        Ir::Pow { base, exponent } => {
            let base_str = match base.as_ref() {
                Ir::Sum { .. } | Ir::Prod { .. } => format!("({})", pretty_ascii(base)),
                other => pretty_ascii(other),
            };
            match exponent {
                Exponent::Rational { value } => {
                    let r: Rational = value.into();
                    format!("{}^{}", base_str, r)
                }
                Exponent::Sym { name } => format!("{}^{}", base_str, name),
            }
        }
        Ir::Log { base, arg } => {
            if *base == 2 {
                format!("log({})", pretty_ascii(arg))
            } else {
                format!("log_{}({})", base, pretty_ascii(arg))
            }
        }
        Ir::Max { alts } => format!(
            "max({})",
            alts.iter().map(pretty_ascii).collect::<Vec<_>>().join(", ")
        ),
        Ir::Min { alts } => format!(
            "min({})",
            alts.iter().map(pretty_ascii).collect::<Vec<_>>().join(", ")
        ),
        Ir::Piecewise { cases } => format!(
            "piecewise({})",
            cases
                .iter()
                .map(|(label, v)| format!("{}: {}", label, pretty_ascii(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Render the asymptotic (coefficient-stripped) big-O string for a single
/// dominant monomial, e.g. `2*n^2` renders as `n^2`, `3` renders as `1`.
pub fn big_o_string(term: &Ir) -> String {
    pretty_ascii(&strip_coefficients(term))
}

fn strip_coefficients(ir: &Ir) -> Ir {
    match ir {
        Ir::K { .. } => Ir::one(),
        Ir::Prod { factors } => {
            let rest: Vec<Ir> = factors.iter().filter(|f| f.as_const().is_none()).cloned().collect();
            if rest.is_empty() {
                Ir::one()
            } else if rest.len() == 1 {
                rest.into_iter().next().unwrap()
            } else {
                Ir::prod(rest)
            }
        }
        Ir::Sum { terms } => Ir::sum(terms.iter().map(strip_coefficients).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n() -> Ir {
        Ir::sym("n")
    }

    #[test]
    fn identity_zero_plus_x() {
        let mut s = Simplifier::default();
        let out = s.simplify(&Ir::sum(vec![Ir::zero(), n()]));
        assert_eq!(out, n());
    }

    #[test]
    fn identity_one_times_x() {
        let mut s = Simplifier::default();
        let out = s.simplify(&Ir::prod(vec![Ir::one(), n()]));
        assert_eq!(out, n());
    }

    #[test]
    fn identity_zero_times_x() {
        let mut s = Simplifier::default();
        let out = s.simplify(&Ir::prod(vec![Ir::zero(), n()]));
        assert_eq!(out, Ir::zero());
    }

    #[test]
    fn collects_like_terms() {
        let mut s = Simplifier::default();
        let out = s.simplify(&Ir::sum(vec![n(), n(), n()]));
        assert_eq!(out, Ir::prod(vec![Ir::int(3), n()]));
    }

    #[test]
    fn pow_zero_and_one() {
        let mut s = Simplifier::default();
        assert_eq!(s.simplify(&Ir::pow(n(), Exponent::r(Rational::ZERO))), Ir::one());
        assert_eq!(s.simplify(&Ir::pow(n(), Exponent::r(Rational::ONE))), n());
    }

    #[test]
    fn log_of_one_is_zero() {
        let mut s = Simplifier::default();
        assert_eq!(s.simplify(&Ir::log(2, Ir::one())), Ir::zero());
    }

    #[test]
    fn log_of_power_cancels() {
        let mut s = Simplifier::default();
        let out = s.simplify(&Ir::log(2, Ir::pow(Ir::int(2), Exponent::sym("n"))));
        assert_eq!(out, n());
    }

    #[test]
    fn idempotent_simplification() {
        let mut s1 = Simplifier::default();
        let mut s2 = Simplifier::default();
        let expr = Ir::sum(vec![n(), Ir::zero(), Ir::prod(vec![Ir::one(), n()])]);
        let once = s1.simplify(&expr);
        let twice = s2.simplify(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn dominant_term_picks_higher_degree() {
        let mut s = Simplifier::default();
        let n2 = Ir::pow(n(), Exponent::r(Rational::TWO));
        let sum = s.simplify(&Ir::sum(vec![n(), n2.clone()]));
        assert_eq!(dominant_term(&sum), n2);
    }

    #[test]
    fn n_log_n_beats_n() {
        assert_eq!(cmp(&Ir::prod(vec![n(), Ir::log(2, n())]), &n()), Cmp::Greater);
    }

    #[test]
    fn exponential_beats_any_polynomial() {
        let exp = Ir::pow(Ir::int(2), Exponent::sym("n"));
        let poly = Ir::pow(n(), Exponent::r(Rational::from_int(5)));
        assert_eq!(cmp(&exp, &poly), Cmp::Greater);
    }

    #[test]
    fn polynomial_form_roundtrip() {
        let mut s = Simplifier::default();
        let expr = s.simplify(&Ir::sum(vec![
            Ir::pow(n(), Exponent::r(Rational::TWO)),
            Ir::prod(vec![Ir::int(3), n()]),
            Ir::int(4),
        ]));
        let poly = polynomial_form(&expr, "n").unwrap();
        assert_eq!(poly.dominant_degree, 2);
        assert_eq!(poly.coefficients[0], Rational::from_int(4));
        assert_eq!(poly.coefficients[1], Rational::from_int(3));
        assert_eq!(poly.coefficients[2], Rational::ONE);
    }

    #[test]
    fn big_o_string_strips_constants() {
        let mut s = Simplifier::default();
        let expr = s.simplify(&Ir::prod(vec![Ir::int(3), n()]));
        assert_eq!(big_o_string(&expr), "n");
    }

    #[test]
    fn simplification_budget_is_respected() {
        let mut s = Simplifier::new(0);
        let expr = Ir::sum(vec![Ir::zero(), n()]);
        let out = s.simplify(&expr);
        assert!(s.exceeded());
        assert_eq!(out, expr);
    }
}
