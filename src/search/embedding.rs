//! Harmonic Token Projection (HTP) embedding
//!
//! Deterministic bag-of-tokens embedding that needs no model file. Each token
//! is hashed to an integer whose residues modulo a table of primes are mapped
//! onto the unit circle; a text embedding is the L2-normalized mean of its
//! token embeddings. Texts with no shared tokens land near-orthogonal.

use anyhow::Result;
use std::f64::consts::PI;

/// HTP embedding dimension
pub const EMBEDDING_DIM: usize = 384;
const NUM_MODULI: usize = EMBEDDING_DIM / 2;

static COPRIME_MODULI: &[u64] = &[
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
    101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191, 193,
    197, 199, 211, 223, 227, 229, 233, 239, 241, 251, 257, 263, 269, 271, 277, 281, 283, 293, 307,
    311, 313, 317, 331, 337, 347, 349, 353, 359, 367, 373, 379, 383, 389, 397, 401, 409, 419, 421,
    431, 433, 439, 443, 449, 457, 461, 463, 467, 479, 487, 491, 499, 503, 509, 521, 523, 541, 547,
    557, 563, 569, 571, 577, 587, 593, 599, 601, 607, 613, 617, 619, 631, 641, 643, 647, 653, 659,
    661, 673, 677, 683, 691, 701, 709, 719, 727, 733, 739, 743, 751, 757, 761, 769, 773, 787, 797,
    809, 811, 821, 823, 827, 829, 839, 853, 857, 859, 863, 877, 881, 883, 887, 907, 911, 919, 929,
    937, 941, 947, 953, 967, 971, 977, 983, 991, 997, 1009, 1013, 1019, 1021, 1031, 1033, 1039,
    1049, 1051, 1061, 1063, 1069, 1087, 1091, 1093, 1097, 1103, 1109, 1117, 1123, 1129, 1151, 1153,
    1163, 1171, 1181,
];

/// Built-in embedding model
#[derive(Debug, Clone, Default)]
pub struct EmbeddingModel;

impl EmbeddingModel {
    pub fn new() -> Self {
        Self
    }

    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(embed_text(text))
    }

    pub fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| embed_text(t)).collect())
    }
}

pub fn embed_text(text: &str) -> Vec<f32> {
    let tokens = tokenize(text);

    if tokens.is_empty() {
        return vec![0.0; EMBEDDING_DIM];
    }

    let mut sum_embedding = vec![0.0f64; EMBEDDING_DIM];

    for token in &tokens {
        for (i, val) in embed_token(token).iter().enumerate() {
            sum_embedding[i] += val;
        }
    }

    let count = tokens.len() as f64;
    for val in &mut sum_embedding {
        *val /= count;
    }

    let norm: f64 = sum_embedding.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        sum_embedding.iter().map(|x| (*x / norm) as f32).collect()
    } else {
        sum_embedding.iter().map(|x| *x as f32).collect()
    }
}

fn embed_token(token: &str) -> Vec<f64> {
    let n = token_to_integer(token);
    let mut embedding = Vec::with_capacity(EMBEDDING_DIM);

    for &m in COPRIME_MODULI.iter().take(NUM_MODULI) {
        let r = n % m;
        let theta = 2.0 * PI * (r as f64) / (m as f64);
        embedding.push(theta.sin());
        embedding.push(theta.cos());
    }

    embedding
}

/// FNV-1a over the token bytes; every character affects the result
fn token_to_integer(token: &str) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for b in token.as_bytes() {
        h ^= *b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}
