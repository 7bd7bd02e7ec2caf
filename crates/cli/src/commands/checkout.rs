use shopfront_storefront::{Result, Storefront};

use crate::CheckoutArgs;
use crate::output;

pub async fn run(store: &Storefront, args: CheckoutArgs) -> Result<()> {
    // Check out what the backend holds, not a stale local copy
    store.cart().fetch_cart_items().await?;
    let checkout = store.checkout();

    let receipt = if args.no_shipping {
        checkout.place_order_without_shipping(args.payment).await?
    } else {
        let mut form = checkout.blank_form();
        let fields = [
            (&mut form.full_name, args.full_name),
            (&mut form.email, args.contact_email),
            (&mut form.phone, args.phone),
            (&mut form.address, args.address),
            (&mut form.city, args.city),
            (&mut form.state, args.state),
            (&mut form.zip_code, args.zip),
            (&mut form.country, args.country),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                *field = value;
            }
        }
        checkout.place_order(&form, args.payment).await?
    };

    output::receipt(&receipt);
    Ok(())
}
