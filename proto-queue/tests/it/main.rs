mod membership;
mod ordering;
