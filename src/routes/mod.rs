pub(crate) mod stocks;
