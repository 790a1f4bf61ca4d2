use brigade_codec::{ByteSink, Decode, Encode, InputStream};

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub u32);

        impl $name {
            pub const NONE: Self = Self(0);

            pub fn is_none(self) -> bool {
                self.0 == 0
            }
        }

        impl Encode for $name {
            fn encode<S: ByteSink>(&self, out: &mut S) {
                self.0.encode(out);
            }
        }

        impl Decode for $name {
            fn decode(input: &mut InputStream) -> Option<Self> {
                u32::decode(input).map(Self)
            }
        }
    };
}

entity_id!(PlayerId);
entity_id!(ProjectileId);
entity_id!(ExplosionId);
entity_id!(SentryGunId);
entity_id!(MedkitId);
entity_id!(AmmopackId);
entity_id!(GenericEntityId);
entity_id!(FlagId);
entity_id!(PayloadCartId);
