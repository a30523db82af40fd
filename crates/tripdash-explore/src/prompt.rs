use crate::parse::BLOCK_DELIMITER;

/// Prompt asking for `count` places in `query`, in the block format
/// [`crate::extract_locations`] reads.
#[must_use]
pub fn build_explore_prompt(query: &str, count: usize) -> String {
    format!(
        "Generate a list of top {count} things to do in {query}.\n\
         For each item, provide a brief description and the exact location \
         (latitude and longitude) in this format:\n\
         Name: [Place Name]\n\
         Description: [Brief description]\n\
         Location: [latitude,longitude]\n\
         {BLOCK_DELIMITER}"
    )
}
