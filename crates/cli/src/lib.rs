// Library surface of the streetscape CLI (pipeline orchestration)

pub mod pipeline;
