mod matching;
mod prefixes;
