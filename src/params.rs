// SPDX-License-Identifier: MIT
//! Poseidon parameter tables for BN254, x⁵ S-box, 8 full rounds.
//!
//! Nothing is shipped as a constant blob. For each width the round constants
//! and the Cauchy MDS matrix are drawn from the Grain LFSR exactly like the
//! reference `generate_parameters_grain.sage` (field = 1, sbox = 0, n = 254),
//! which is what circomlib's tables were produced from. The optimised form used
//! by [`crate::poseidon`] (shifted constants, transition matrix `P`, sparse
//! partial-round rows `S`) is then derived once and cached for the lifetime of
//! the process.

use ark_ff::{BigInteger, BigInteger256, Field, PrimeField, Zero};
use num_bigint::BigUint;
use once_cell::sync::OnceCell;

use crate::{Felt, error::ConfigError};

pub const FULL_ROUNDS: usize = 8;
pub const MIN_WIDTH: usize = 2;
pub const MAX_WIDTH: usize = 17;
pub const ALPHA: u64 = 5;

/// Partial rounds per width, indexed by `t - 2`.
pub const PARTIAL_ROUNDS: [usize; MAX_WIDTH - MIN_WIDTH + 1] =
    [56, 57, 56, 60, 60, 63, 64, 63, 60, 66, 60, 65, 70, 60, 64, 68];

const FIELD_BITS: usize = 254;
const GRAIN_STATE: usize = 80;
const GRAIN_WARMUP: usize = 160;
const MAX_MDS_ATTEMPTS: usize = 64;

type Matrix = Vec<Vec<Felt>>;

//  ---------------------------------------------------------------------------
//  Width checks
//  ---------------------------------------------------------------------------

pub fn check_width(width: usize) -> Result<(), ConfigError> {
    if (MIN_WIDTH..=MAX_WIDTH).contains(&width) {
        Ok(())
    } else {
        Err(ConfigError::UnsupportedWidth { width })
    }
}

pub fn partial_rounds(width: usize) -> Result<usize, ConfigError> {
    check_width(width)?;
    Ok(PARTIAL_ROUNDS[width - MIN_WIDTH])
}

//  ---------------------------------------------------------------------------
//  Grain LFSR
//  ---------------------------------------------------------------------------

/// Self-shrinking 80-bit Grain LFSR from the Poseidon reference scripts.
struct Grain {
    state: [bool; GRAIN_STATE],
    head: usize,
}

impl Grain {
    fn new(width: usize, partial_rounds: usize) -> Self {
        let mut init = Vec::with_capacity(GRAIN_STATE);
        push_bits(&mut init, 1, 2); // prime field
        push_bits(&mut init, 0, 4); // x^alpha S-box
        push_bits(&mut init, FIELD_BITS, 12);
        push_bits(&mut init, width, 12);
        push_bits(&mut init, FULL_ROUNDS, 10);
        push_bits(&mut init, partial_rounds, 10);
        init.resize(GRAIN_STATE, true);

        let mut state = [false; GRAIN_STATE];
        state.copy_from_slice(&init);
        let mut grain = Self { state, head: 0 };
        for _ in 0..GRAIN_WARMUP {
            grain.clock();
        }
        grain
    }

    #[inline]
    fn tap(&self, k: usize) -> bool {
        self.state[(self.head + k) % GRAIN_STATE]
    }

    /// Shift the register once; the oldest bit drops out.
    fn clock(&mut self) -> bool {
        let bit =
            self.tap(62) ^ self.tap(51) ^ self.tap(38) ^ self.tap(23) ^ self.tap(13) ^ self.tap(0);
        self.state[self.head] = bit;
        self.head = (self.head + 1) % GRAIN_STATE;
        bit
    }

    /// Pairs `(b1, b2)`: emit `b2` when `b1 = 1`, discard both otherwise.
    fn next_bit(&mut self) -> bool {
        loop {
            let keep = self.clock();
            let bit = self.clock();
            if keep {
                return bit;
            }
        }
    }

    /// 254 output bits, most significant first.
    fn next_bigint(&mut self) -> BigInteger256 {
        let bits: Vec<bool> = (0..FIELD_BITS).map(|_| self.next_bit()).collect();
        BigInteger256::from_bits_be(&bits)
    }

    /// Rejection-sampled field element (round constants).
    fn next_field_element(&mut self) -> Felt {
        loop {
            if let Some(value) = Felt::from_bigint(self.next_bigint()) {
                return value;
            }
        }
    }

    /// Field element reduced mod p without rejection (MDS seeds).
    fn next_reduced(&mut self) -> Felt {
        Felt::from(BigUint::from(self.next_bigint()))
    }
}

fn push_bits(out: &mut Vec<bool>, value: usize, width: usize) {
    out.extend((0..width).rev().map(|i| (value >> i) & 1 == 1));
}

//  ---------------------------------------------------------------------------
//  Linear algebra helpers
//  ---------------------------------------------------------------------------

fn mat_vec(m: &Matrix, v: &[Felt]) -> Vec<Felt> {
    m.iter()
        .map(|row| row.iter().zip(v).fold(Felt::zero(), |acc, (a, b)| acc + *a * b))
        .collect()
}

fn mat_mul(a: &Matrix, b: &Matrix) -> Matrix {
    let n = b.first().map_or(0, Vec::len);
    a.iter()
        .map(|row| {
            (0..n)
                .map(|j| {
                    row.iter()
                        .zip(b)
                        .fold(Felt::zero(), |acc, (x, b_row)| acc + *x * b_row[j])
                })
                .collect()
        })
        .collect()
}

fn transpose(m: &Matrix) -> Matrix {
    let n = m.first().map_or(0, Vec::len);
    (0..n).map(|j| m.iter().map(|row| row[j]).collect()).collect()
}

/// Gauss–Jordan inversion. `width` only labels the error.
fn invert(m: &Matrix, width: usize) -> Result<Matrix, ConfigError> {
    let n = m.len();
    let mut aug: Matrix = m
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut r = row.clone();
            r.extend((0..n).map(|j| Felt::from(i == j)));
            r
        })
        .collect();

    for col in 0..n {
        let pivot = (col..n)
            .find(|&r| !aug[r][col].is_zero())
            .ok_or(ConfigError::SingularMatrix { width })?;
        aug.swap(pivot, col);
        let inv = aug[col][col]
            .inverse()
            .ok_or(ConfigError::SingularMatrix { width })?;
        for x in aug[col].iter_mut() {
            *x *= inv;
        }
        let pivot_row = aug[col].clone();
        for (r, row) in aug.iter_mut().enumerate() {
            if r == col || row[col].is_zero() {
                continue;
            }
            let factor = row[col];
            for (x, p) in row.iter_mut().zip(&pivot_row) {
                *x -= factor * p;
            }
        }
    }
    Ok(aug.into_iter().map(|row| row[n..].to_vec()).collect())
}

//  ---------------------------------------------------------------------------
//  Plain (reference) parameters
//  ---------------------------------------------------------------------------

/// Round constants and MDS matrix as produced by the Grain procedure, in the
/// textbook orientation: `state' = mds · state`.
#[derive(Debug, Clone)]
pub struct RawParams {
    pub width: usize,
    pub partial_rounds: usize,
    /// `(FULL_ROUNDS + partial_rounds) * width` constants, round-major.
    pub round_constants: Vec<Felt>,
    pub mds: Vec<Vec<Felt>>,
}

impl RawParams {
    pub fn generate(width: usize) -> Result<Self, ConfigError> {
        let partial_rounds = partial_rounds(width)?;
        let mut grain = Grain::new(width, partial_rounds);

        let total = (FULL_ROUNDS + partial_rounds) * width;
        let round_constants: Vec<Felt> = (0..total).map(|_| grain.next_field_element()).collect();
        let mds = cauchy_mds(&mut grain, width)?;

        let raw = Self {
            width,
            partial_rounds,
            round_constants,
            mds,
        };
        raw.validate()?;
        Ok(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let width = self.width;
        expect_len(
            "round constant",
            width,
            (FULL_ROUNDS + self.partial_rounds) * width,
            self.round_constants.len(),
        )?;
        expect_square("MDS", width, &self.mds)
    }
}

fn cauchy_mds(grain: &mut Grain, width: usize) -> Result<Matrix, ConfigError> {
    'attempt: for _ in 0..MAX_MDS_ATTEMPTS {
        let seeds: Vec<Felt> = (0..2 * width).map(|_| grain.next_reduced()).collect();
        for (i, a) in seeds.iter().enumerate() {
            if seeds[i + 1..].contains(a) {
                continue 'attempt;
            }
        }
        let (xs, ys) = seeds.split_at(width);
        let mut mds = Vec::with_capacity(width);
        for x in xs {
            let mut row = Vec::with_capacity(width);
            for y in ys {
                match (*x + y).inverse() {
                    Some(entry) => row.push(entry),
                    None => continue 'attempt,
                }
            }
            mds.push(row);
        }
        return Ok(mds);
    }
    Err(ConfigError::ParameterSearch { width })
}

//  ---------------------------------------------------------------------------
//  Optimised parameters
//  ---------------------------------------------------------------------------

/// Tables consumed by the permutation engine for one width.
///
/// Matrices are stored in circom orientation: a mix computes
/// `out[i] = Σ_j m[j][i] · in[j]`.
#[derive(Debug, Clone)]
pub struct PoseidonParams {
    pub width: usize,
    pub partial_rounds: usize,
    /// Round constants added after each S-box layer; `FULL_ROUNDS * width +
    /// partial_rounds` entries (one scalar per partial round).
    pub c: Vec<Felt>,
    /// Sparse partial-round data, `2 * width - 1` entries per round: the new
    /// lane-0 row followed by the lane-0 column for lanes `1..width`.
    pub s: Vec<Felt>,
    pub m: Vec<Vec<Felt>>,
    /// Transition matrix applied before the first partial round.
    pub p: Vec<Vec<Felt>>,
}

impl PoseidonParams {
    pub fn generate(width: usize) -> Result<Self, ConfigError> {
        let raw = RawParams::generate(width)?;
        tracing::debug!(width, partial_rounds = raw.partial_rounds, "deriving Poseidon tables");
        Self::from_raw(&raw)
    }

    /// Shift the round constants past the S-boxes, fold the partial-round
    /// constants into lane 0, and factor the partial-round matrices into
    /// sparse form.
    pub fn from_raw(raw: &RawParams) -> Result<Self, ConfigError> {
        raw.validate()?;
        let t = raw.width;
        let rp = raw.partial_rounds;
        let half = FULL_ROUNDS / 2;
        let rounds = FULL_ROUNDS + rp;
        let mds = &raw.mds;
        let mds_inv = invert(mds, t)?;
        let round = |k: usize| &raw.round_constants[k * t..(k + 1) * t];

        // post[k] is added after the S-box of round k: M⁻¹ · a_{k+1}.
        let mut post: Vec<Vec<Felt>> = (0..rounds)
            .map(|k| {
                if k + 1 < rounds {
                    mat_vec(&mds_inv, round(k + 1))
                } else {
                    vec![Felt::zero(); t]
                }
            })
            .collect();

        // Lanes 1.. of a partial-round constant commute with its S-box.
        let mut scalars = vec![Felt::zero(); rp];
        for k in (half..half + rp).rev() {
            scalars[k - half] = post[k][0];
            let mut rest = post[k].clone();
            rest[0] = Felt::zero();
            let pushed = mat_vec(&mds_inv, &rest);
            for (acc, v) in post[k - 1].iter_mut().zip(pushed) {
                *acc += v;
            }
        }

        let mut c = Vec::with_capacity(FULL_ROUNDS * t + rp);
        c.extend_from_slice(round(0));
        for constants in &post[..half] {
            c.extend_from_slice(constants);
        }
        c.extend_from_slice(&scalars);
        for constants in &post[half + rp..rounds - 1] {
            c.extend_from_slice(constants);
        }

        // A = S · diag(1, Â); diag(1, Â) moves into the previous round.
        let mut a = mds.clone();
        let mut rows = vec![Vec::new(); rp];
        for r in (0..rp).rev() {
            let hat: Matrix = a[1..].iter().map(|row| row[1..].to_vec()).collect();
            let hat_inv = invert(&hat, t)?;
            let mut row = Vec::with_capacity(2 * t - 1);
            row.push(a[0][0]);
            row.extend((0..t - 1).map(|j| {
                (0..t - 1).fold(Felt::zero(), |acc, k| acc + a[0][1 + k] * hat_inv[k][j])
            }));
            row.extend(a[1..].iter().map(|lane| lane[0]));
            rows[r] = row;

            let mut d: Matrix = (0..t)
                .map(|i| (0..t).map(|j| Felt::from(i == j)).collect())
                .collect();
            for i in 1..t {
                d[i][1..].copy_from_slice(&hat[i - 1]);
            }
            a = mat_mul(&d, mds);
        }

        let params = Self {
            width: t,
            partial_rounds: rp,
            c,
            s: rows.concat(),
            m: transpose(mds),
            p: transpose(&a),
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let width = self.width;
        if partial_rounds(width)? != self.partial_rounds {
            return Err(ConfigError::TableLength {
                table: "partial round",
                width,
                expected: PARTIAL_ROUNDS[width - MIN_WIDTH],
                actual: self.partial_rounds,
            });
        }
        expect_len("C", width, FULL_ROUNDS * width + self.partial_rounds, self.c.len())?;
        expect_len("S", width, (2 * width - 1) * self.partial_rounds, self.s.len())?;
        expect_square("M", width, &self.m)?;
        expect_square("P", width, &self.p)
    }
}

fn expect_len(
    table: &'static str,
    width: usize,
    expected: usize,
    actual: usize,
) -> Result<(), ConfigError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ConfigError::TableLength {
            table,
            width,
            expected,
            actual,
        })
    }
}

fn expect_square(table: &'static str, width: usize, m: &Matrix) -> Result<(), ConfigError> {
    expect_len(table, width, width, m.len())?;
    for row in m {
        expect_len(table, width, width, row.len())?;
    }
    Ok(())
}

//  ---------------------------------------------------------------------------
//  Process-wide cache
//  ---------------------------------------------------------------------------

static TABLES: [OnceCell<PoseidonParams>; MAX_WIDTH - MIN_WIDTH + 1] =
    [const { OnceCell::new() }; MAX_WIDTH - MIN_WIDTH + 1];

/// Tables for width `t`, generated on first use.
pub fn params(width: usize) -> Result<&'static PoseidonParams, ConfigError> {
    check_width(width)?;
    TABLES[width - MIN_WIDTH].get_or_try_init(|| PoseidonParams::generate(width))
}
