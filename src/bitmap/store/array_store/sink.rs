/// Receives the output of a sorted-slice merge, in increasing order.
///
/// The same merge either builds a new array (`Vec<u16>`) or only counts (`Count`).
pub trait Sink {
    fn push(&mut self, value: u16);

    fn push_slice(&mut self, values: &[u16]);
}

impl Sink for Vec<u16> {
    #[inline]
    fn push(&mut self, value: u16) {
        Vec::push(self, value);
    }

    #[inline]
    fn push_slice(&mut self, values: &[u16]) {
        self.extend_from_slice(values);
    }
}

#[derive(Default)]
pub struct Count(pub u64);

impl Sink for Count {
    #[inline]
    fn push(&mut self, _: u16) {
        self.0 += 1;
    }

    #[inline]
    fn push_slice(&mut self, values: &[u16]) {
        self.0 += values.len() as u64;
    }
}
