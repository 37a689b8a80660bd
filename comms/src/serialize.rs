/// Serializes a message into a frame body.
pub trait Serialize<'a> {
    /// Writes the owned part of the message into `buf`.
    ///
    /// # Arguments
    /// * `buf` - The buffer to write the header and any owned data into.
    ///
    /// # Returns
    /// A borrowed slice that must be sent right after `buf`, avoiding a copy of large payloads.
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]>;
}
