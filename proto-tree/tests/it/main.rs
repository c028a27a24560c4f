mod cursor;
mod ordering;
