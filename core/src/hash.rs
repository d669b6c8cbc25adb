//! The sponge hash primitive: a fixed permutation over 16 base field elements
//! with rate 10 and capacity 6, used for program attestation, Merkle
//! commitments, the in-VM hashing instructions, and the Fiat–Shamir
//! transcript.
//!
//! Each round adds round constants, applies the power map x⁷ to every state
//! element, and mixes the state through a circulant MDS matrix. The power map
//! is a bijection because 7 is coprime to p − 1.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::field::{Felt, ZERO};

// CONSTANTS
// ================================================================================================

/// Number of field elements in the sponge state.
pub const STATE_SIZE: usize = 16;

/// Number of state elements absorbed or squeezed per permutation.
pub const RATE: usize = 10;

/// Number of field elements in a digest.
pub const DIGEST_LEN: usize = 5;

/// Number of rounds in the permutation.
pub const NUM_ROUNDS: usize = 8;

/// Number of rows in a recorded permutation trace: the state before every
/// round plus the final state.
pub const PERMUTATION_TRACE_LEN: usize = NUM_ROUNDS + 1;

const ROUND_CONSTANTS: [[Felt; STATE_SIZE]; NUM_ROUNDS] = [
    [Felt::new(11077254476321222569), Felt::new(16898907361932730421), Felt::new(17261491636412755438), Felt::new(3470231219255171808), Felt::new(2377618496277602637), Felt::new(8058345045372450410), Felt::new(11026092581554546363), Felt::new(11878799424926396206), Felt::new(17921126478838961707), Felt::new(9872166632138186706), Felt::new(12728843218587761725), Felt::new(6565282946486735074), Felt::new(710513739413709871), Felt::new(1375343792418958977), Felt::new(10340655973373579534), Felt::new(11245367698641560482)],
    [Felt::new(18061495454942614312), Felt::new(3477944324193432121), Felt::new(13622078263722334256), Felt::new(5557688944416957366), Felt::new(1386144974789851150), Felt::new(2365397897127602144), Felt::new(14313358965288349259), Felt::new(2438170539141420345), Felt::new(1736980818418553344), Felt::new(6591753845505601325), Felt::new(1808023029395128680), Felt::new(14979016328845472782), Felt::new(11358246417126968640), Felt::new(1737896958983788834), Felt::new(3882957306724022179), Felt::new(1987484124848557571)],
    [Felt::new(13570684097392904352), Felt::new(8002802834523798869), Felt::new(16217761691386435701), Felt::new(8954471059207588702), Felt::new(2024457435834070534), Felt::new(15272856787952056368), Felt::new(3714920262416753990), Felt::new(8350884065886234127), Felt::new(7487920031201527041), Felt::new(13127777572450292306), Felt::new(16183226054633384185), Felt::new(12495676333943491525), Felt::new(838593725693258216), Felt::new(5986329074279170620), Felt::new(3853707693366969825), Felt::new(185146564905398528)],
    [Felt::new(16579884300462297420), Felt::new(6721387357990675399), Felt::new(7399169438612586134), Felt::new(15283971829707191331), Felt::new(11053661567200397963), Felt::new(3081605786827047989), Felt::new(192064217347004628), Felt::new(13506486319972673703), Felt::new(14719611133911529250), Felt::new(17586331719440531233), Felt::new(7024104236962211473), Felt::new(11415220311838828068), Felt::new(966649245286666720), Felt::new(8490350744075819369), Felt::new(6210378491280569513), Felt::new(5250475197458084348)],
    [Felt::new(8385397221104654504), Felt::new(12353152120012465973), Felt::new(11240198750335903825), Felt::new(16701571684369205635), Felt::new(5868454548521960825), Felt::new(15622577324382318324), Felt::new(11178666135155183464), Felt::new(1830897086047654965), Felt::new(5164874604420129581), Felt::new(9177367098303591101), Felt::new(18171439083189098079), Felt::new(16165169820654754903), Felt::new(13438427346712447850), Felt::new(12200328799160651445), Felt::new(7390072513068194115), Felt::new(17874263039701541548)],
    [Felt::new(2239313577953850323), Felt::new(4615947139687215453), Felt::new(3540738481623915510), Felt::new(14821995507956320186), Felt::new(8767664942410742229), Felt::new(17891852170901862037), Felt::new(7456238146227438413), Felt::new(2900953661321289283), Felt::new(10095441552808245258), Felt::new(15856604181179198741), Felt::new(4100328012408637364), Felt::new(7433187490506808544), Felt::new(4098873590036444467), Felt::new(13108151995094548308), Felt::new(5045976300937642913), Felt::new(5470276422181511047)],
    [Felt::new(10431658181773784869), Felt::new(16339397496815413460), Felt::new(14872604496322478106), Felt::new(17995321174879085711), Felt::new(3468982304598120382), Felt::new(4187090455432093262), Felt::new(14333150007983791679), Felt::new(4474571578941748792), Felt::new(3017244449709055141), Felt::new(2601822940337386491), Felt::new(16442513485403010504), Felt::new(618401315038938134), Felt::new(9030640907698895545), Felt::new(4358078478791012969), Felt::new(12936612674792829033), Felt::new(8681779500007265802)],
    [Felt::new(10005672102775536964), Felt::new(17565130545217361401), Felt::new(7110770644948767695), Felt::new(6972043523576706252), Felt::new(14990370754100044712), Felt::new(16951406112580987067), Felt::new(15835661772608246881), Felt::new(9298595437433213664), Felt::new(14503179095135110119), Felt::new(17164086746553538780), Felt::new(10110631424373522381), Felt::new(6024618841458034253), Felt::new(9903538093795530250), Felt::new(2554459268879979436), Felt::new(8643860230724185523), Felt::new(14084520522302484763)],
];

/// First row of the circulant MDS matrix; row i is this row rotated right by i.
const MDS_ROW: [u64; STATE_SIZE] = [
    41703, 37421, 7633, 23375, 60173, 30555, 64775, 57048, 5571, 42651, 8618, 50178, 64776, 41003,
    17284, 19111,
];

// DIGEST
// ================================================================================================

/// A 5-element hash digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Digest(pub [Felt; DIGEST_LEN]);

impl Digest {
    pub const fn new(elements: [Felt; DIGEST_LEN]) -> Self {
        Self(elements)
    }

    pub fn elements(&self) -> &[Felt; DIGEST_LEN] {
        &self.0
    }

    /// Renders the digest as 80 lowercase hex characters, 16 per element.
    pub fn to_hex(&self) -> String {
        self.0.iter().flat_map(|e| e.value().to_be_bytes()).map(|b| format!("{b:02x}")).collect()
    }

    /// Parses a digest from the 80-character hex form produced by
    /// [`Self::to_hex`]. Returns `None` for malformed input.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 2 * 8 * DIGEST_LEN || !hex.is_ascii() {
            return None;
        }
        let mut elements = [ZERO; DIGEST_LEN];
        for (i, chunk) in hex.as_bytes().chunks(16).enumerate() {
            let raw = u64::from_str_radix(core::str::from_utf8(chunk).ok()?, 16).ok()?;
            if raw >= crate::field::MODULUS {
                return None;
            }
            elements[i] = Felt::new(raw);
        }
        Some(Self(elements))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<Digest> for Vec<Felt> {
    fn from(digest: Digest) -> Self {
        digest.0.to_vec()
    }
}

// SPONGE STATE
// ================================================================================================

/// The sponge state: 16 field elements, the first [`RATE`] of which form the
/// rate portion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpongeState {
    pub state: [Felt; STATE_SIZE],
}

impl SpongeState {
    /// A fresh all-zero sponge.
    pub fn init() -> Self {
        Self { state: [ZERO; STATE_SIZE] }
    }

    /// Applies the permutation in place.
    pub fn permute(&mut self) {
        for round in 0..NUM_ROUNDS {
            self.apply_round(round);
        }
    }

    /// Applies the permutation and returns the state before every round along
    /// with the final state.
    pub fn permute_with_trace(&mut self) -> [[Felt; STATE_SIZE]; PERMUTATION_TRACE_LEN] {
        let mut trace = [[ZERO; STATE_SIZE]; PERMUTATION_TRACE_LEN];
        for round in 0..NUM_ROUNDS {
            trace[round] = self.state;
            self.apply_round(round);
        }
        trace[NUM_ROUNDS] = self.state;
        trace
    }

    /// Adds a rate-sized chunk into the rate portion and permutes.
    pub fn absorb(&mut self, chunk: &[Felt; RATE]) {
        for (state_element, &input) in self.state.iter_mut().zip(chunk) {
            *state_element += input;
        }
        self.permute();
    }

    /// Permutes and returns the rate portion.
    pub fn squeeze(&mut self) -> [Felt; RATE] {
        self.permute();
        self.state[..RATE].try_into().expect("rate fits in state")
    }

    /// The first [`DIGEST_LEN`] elements of the current state.
    pub fn digest(&self) -> Digest {
        Digest::new(self.state[..DIGEST_LEN].try_into().expect("digest fits in state"))
    }

    fn apply_round(&mut self, round: usize) {
        for (state_element, &constant) in self.state.iter_mut().zip(&ROUND_CONSTANTS[round]) {
            *state_element += constant;
        }
        for state_element in self.state.iter_mut() {
            *state_element = state_element.pow(7);
        }
        self.state = mds_multiply(&self.state);
    }
}

fn mds_multiply(state: &[Felt; STATE_SIZE]) -> [Felt; STATE_SIZE] {
    let mut result = [ZERO; STATE_SIZE];
    for (row, result_element) in result.iter_mut().enumerate() {
        let mut acc = ZERO;
        for column in 0..STATE_SIZE {
            let entry = MDS_ROW[(column + STATE_SIZE - row) % STATE_SIZE];
            acc += Felt::new(entry) * state[column];
        }
        *result_element = acc;
    }
    result
}

// HASHING
// ================================================================================================

/// Pads the input with a single one followed by zeros up to a multiple of the
/// rate.
pub fn hash_input_pad(input: &[Felt]) -> Vec<Felt> {
    let mut padded = input.to_vec();
    padded.push(Felt::ONE);
    while padded.len() % RATE != 0 {
        padded.push(ZERO);
    }
    padded
}

/// Hashes a variable-length sequence of field elements into a digest.
pub fn hash_varlen(input: &[Felt]) -> Digest {
    let mut sponge = SpongeState::init();
    for chunk in hash_input_pad(input).chunks(RATE) {
        sponge.absorb(chunk.try_into().expect("padded input is a multiple of the rate"));
    }
    sponge.digest()
}

/// Hashes exactly ten elements with a single permutation; used for the `hash`
/// instruction and for Merkle node compression.
pub fn hash_fixed(input: &[Felt; RATE]) -> Digest {
    let mut sponge = SpongeState::init();
    sponge.absorb(input);
    sponge.digest()
}

/// Compresses two digests into their parent digest.
pub fn hash_pair(left: &Digest, right: &Digest) -> Digest {
    let mut input = [ZERO; RATE];
    input[..DIGEST_LEN].copy_from_slice(left.elements());
    input[DIGEST_LEN..].copy_from_slice(right.elements());
    hash_fixed(&input)
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permutation_changes_the_state() {
        let mut sponge = SpongeState::init();
        sponge.permute();
        assert_ne!(sponge.state, [ZERO; STATE_SIZE]);
    }

    #[test]
    fn permutation_trace_starts_and_ends_at_the_right_states() {
        let mut sponge = SpongeState::init();
        let before = sponge.state;
        let trace = sponge.permute_with_trace();
        assert_eq!(trace[0], before);
        assert_eq!(trace[PERMUTATION_TRACE_LEN - 1], sponge.state);
    }

    #[test]
    fn trace_rounds_match_the_plain_permutation() {
        let mut traced = SpongeState::init();
        traced.state[0] = Felt::new(42);
        let mut plain = traced;
        traced.permute_with_trace();
        plain.permute();
        assert_eq!(traced.state, plain.state);
    }

    #[test]
    fn hashing_is_length_sensitive() {
        let a = hash_varlen(&[Felt::new(1)]);
        let b = hash_varlen(&[Felt::new(1), ZERO]);
        assert_ne!(a, b);
    }

    #[test]
    fn hashing_is_order_sensitive() {
        let a = hash_varlen(&[Felt::new(1), Felt::new(2)]);
        let b = hash_varlen(&[Felt::new(2), Felt::new(1)]);
        assert_ne!(a, b);
    }

    #[test]
    fn digest_hex_round_trips() {
        let digest = hash_varlen(&[Felt::new(123), Felt::new(456)]);
        let hex = digest.to_hex();
        assert_eq!(hex.len(), 80);
        assert_eq!(Digest::from_hex(&hex), Some(digest));
    }

    #[test]
    fn malformed_hex_is_rejected() {
        assert!(Digest::from_hex("abc").is_none());
        assert!(Digest::from_hex(&"zz".repeat(40)).is_none());
    }
}
