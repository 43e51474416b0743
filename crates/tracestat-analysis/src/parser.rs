//! Trace parser.
//!
//! Reconstructs basic blocks and call-site invocation counts from a QEMU
//! `in_asm,exec` style log. The first line of the log is a header and is
//! always skipped. Remaining lines are dispatched on their prefix:
//!
//! - `--` closes the block being decoded and records it
//! - `IN:` opens a new block
//! - `0x...` is a decoded instruction of the current block
//! - `Trace <hart>:` records one entry into a block
//!
//! Anything else is ignored.

use tracestat_core::{Address, CallSite, Error, ExecutionModel, Histogram, LineError, Result};
use tracing::{debug, info, warn};

const BLOCK_SEPARATOR: &str = "--";
const BLOCK_START: &str = "IN:";
const INSTRUCTION_PREFIX: &str = "0x";
const CALL_PREFIX: &str = "Trace ";

/// A decoded instruction line.
///
/// ```text
/// 0x000156b8:  c30c              sw                      a1,0(a4)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub address: Address,
    pub opcode: u64,
    pub mnemonic: String,
    pub operands: Vec<String>,
}

/// A decoded call line.
///
/// ```text
/// Trace 0: 0x7f25d0600980 [00000000/00000000000156c6/0101c078/00000200] memset
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTrace {
    /// Address of the entered block (second bracketed field).
    pub target: Address,
    /// Symbol name, empty when absent.
    pub name: String,
}

/// Decode an instruction line.
pub fn parse_instruction(line: &str) -> std::result::Result<Instruction, LineError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(LineError::MalformedInstruction(line.trim().to_string()));
    }

    let address_token = tokens[0].strip_suffix(':').unwrap_or(tokens[0]);
    let address = parse_hex("address", address_token)?;
    let opcode = parse_hex("opcode", tokens[1])?;
    let operands = tokens
        .get(3)
        .map(|list| list.split(',').map(str::to_string).collect())
        .unwrap_or_default();

    Ok(Instruction {
        address,
        opcode,
        mnemonic: tokens[2].to_string(),
        operands,
    })
}

/// Decode a call line. Only hart 0 is accepted.
pub fn parse_call(line: &str) -> std::result::Result<CallTrace, LineError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    if tokens.first() != Some(&"Trace") {
        return Err(LineError::NotACallLine(line.trim().to_string()));
    }
    match tokens.get(1) {
        Some(&"0:") => {}
        Some(hart) => return Err(LineError::WrongHart(hart.to_string())),
        None => return Err(LineError::MalformedCall(line.trim().to_string())),
    }

    // Older QEMU releases print three fields, newer ones four. The target
    // block address is the second in both.
    let target = tokens
        .get(3)
        .and_then(|fields| fields.strip_prefix('['))
        .and_then(|fields| fields.strip_suffix(']'))
        .and_then(|fields| fields.split('/').nth(1))
        .ok_or_else(|| LineError::MalformedCall(line.trim().to_string()))?;

    Ok(CallTrace {
        target: parse_hex("call target", target)?,
        name: tokens.get(4).map(|name| name.to_string()).unwrap_or_default(),
    })
}

fn parse_hex(field: &'static str, value: &str) -> std::result::Result<u64, LineError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u64::from_str_radix(digits, 16).map_err(|_| LineError::InvalidHex {
        field,
        value: value.to_string(),
    })
}

/// What to do with a line that cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParsePolicy {
    /// Stop at the first malformed line.
    #[default]
    Abort,
    /// Record the line in [`ParsedTrace::skipped`] and keep going.
    Skip,
}

/// A line rejected under [`ParsePolicy::Skip`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number in the trace.
    pub line: usize,
    pub error: LineError,
}

/// Output of a parse run.
#[derive(Debug, Clone, Default)]
pub struct ParsedTrace {
    pub model: ExecutionModel,
    /// Always empty under [`ParsePolicy::Abort`].
    pub skipped: Vec<SkippedLine>,
}

/// The block currently being decoded.
#[derive(Debug, Default)]
struct PendingBlock {
    /// Address of the first decoded instruction, `None` until one is seen.
    address: Option<Address>,
    histogram: Histogram,
}

impl PendingBlock {
    fn reset(&mut self) {
        self.address = None;
        self.histogram = Histogram::new();
    }

    fn record(&mut self, instruction: &Instruction) {
        self.address.get_or_insert(instruction.address);
        self.histogram.add(&instruction.mnemonic, 1);
    }

    /// Store the histogram under the block address.
    ///
    /// The pending state is left untouched: it is only cleared by the next
    /// `IN:` marker.
    fn commit(&self, model: &mut ExecutionModel) {
        match self.address {
            Some(address) => {
                debug!(
                    address = %format!("{address:#x}"),
                    instructions = self.histogram.total(),
                    "committing block"
                );
                model.blocks.insert(address, self.histogram.clone());
            }
            None => debug!("block separator with no decoded instruction, nothing to commit"),
        }
    }
}

/// Line-oriented state machine building an [`ExecutionModel`].
#[derive(Debug, Clone, Default)]
pub struct TraceParser {
    policy: ParsePolicy,
}

impl TraceParser {
    pub fn new(policy: ParsePolicy) -> Self {
        Self { policy }
    }

    /// Parse a complete trace held in memory.
    pub fn parse_str(&self, trace: &str) -> Result<ParsedTrace> {
        let mut parsed = ParsedTrace::default();
        let mut pending = PendingBlock::default();

        for (index, line) in trace.lines().enumerate().skip(1) {
            let line_number = index + 1;
            if let Err(error) = Self::step(&mut pending, &mut parsed.model, line) {
                match self.policy {
                    ParsePolicy::Abort => {
                        return Err(Error::Parse {
                            line: line_number,
                            source: error,
                        })
                    }
                    ParsePolicy::Skip => {
                        warn!(line = line_number, %error, "skipping malformed trace line");
                        parsed.skipped.push(SkippedLine {
                            line: line_number,
                            error,
                        });
                    }
                }
            }
        }

        // The last block has no trailing separator.
        pending.commit(&mut parsed.model);

        info!(
            blocks = parsed.model.blocks.len(),
            call_sites = parsed.model.calls.len(),
            skipped = parsed.skipped.len(),
            "trace parsed"
        );
        Ok(parsed)
    }

    fn step(
        pending: &mut PendingBlock,
        model: &mut ExecutionModel,
        line: &str,
    ) -> std::result::Result<(), LineError> {
        if line.starts_with(BLOCK_SEPARATOR) {
            pending.commit(model);
        } else if line.starts_with(BLOCK_START) {
            pending.reset();
        } else if line.starts_with(INSTRUCTION_PREFIX) {
            pending.record(&parse_instruction(line)?);
        } else if line.starts_with(CALL_PREFIX) {
            let call = parse_call(line)?;
            model
                .calls
                .entry(call.target)
                .and_modify(|site| site.count += 1)
                .or_insert(CallSite {
                    name: call.name,
                    count: 1,
                });
        }
        Ok(())
    }
}
