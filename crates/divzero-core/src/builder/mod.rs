/*! Fluent API for constructing functions programmatically.
 *
 * Hand-wiring blocks and instructions is tedious and error-prone. These builders number SSA
 * temporaries, keep terminators last, and record source locations, so tests and drivers can
 * describe a function in a few lines.
 */

pub mod block_builder;
pub mod function_builder;

pub use block_builder::BlockBuilder;
pub use function_builder::FunctionBuilder;
