use alloy_primitives::{Address, Bytes, U256};

/// Execution-ready projection of a signed transaction.
///
/// Produced by a signer once the sender has been recovered. Executors never see
/// signatures, only the resolved sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub from: Address,
    /// `None` for contract creation
    pub to: Option<Address>,
    pub nonce: u64,
    pub value: U256,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub input: Bytes,
}

impl Message {
    pub const fn is_create(&self) -> bool {
        self.to.is_none()
    }

    /// Address a creation message deploys to, derived from the sender and its nonce.
    pub fn created_address(&self) -> Option<Address> {
        self.is_create().then(|| self.from.create(self.nonce))
    }

    /// Upfront cost of the gas allowance, `gas_limit * gas_price`.
    pub fn gas_cost(&self) -> U256 {
        U256::from(self.gas_limit) * U256::from(self.gas_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn message(to: Option<Address>) -> Message {
        Message {
            from: address!("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0"),
            to,
            nonce: 1,
            value: U256::ZERO,
            gas_limit: 21_000,
            gas_price: 10,
            input: Bytes::new(),
        }
    }

    #[test]
    fn test_created_address() {
        let create = message(None);
        assert!(create.is_create());
        assert_eq!(
            create.created_address(),
            Some(address!("343c43a37d37dff08ae8c4a11544c718abb4fcf8"))
        );

        let call = message(Some(Address::ZERO));
        assert_eq!(call.created_address(), None);
    }

    #[test]
    fn test_gas_cost() {
        assert_eq!(message(None).gas_cost(), U256::from(210_000_u64));
    }
}
