use std::collections::VecDeque;

// bounded history that keeps only the newest `max_length` entries
#[derive(Debug, Clone, PartialEq)]
pub struct History<T> {
    data: VecDeque<T>,
    max_length: usize,
}

impl<T> History<T> {
    pub fn new(max_length: usize) -> Self {
        Self {
            data: VecDeque::with_capacity(max_length),
            max_length,
        }
    }

    pub fn push(&mut self, value: T) {
        if self.max_length == 0 {
            return;
        }
        self.data.push_front(value);

        if self.data.len() > self.max_length {
            self.data.pop_back();
        }
    }

    // newest first
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.data.iter()
    }
}
